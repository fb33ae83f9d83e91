use std::collections::VecDeque;
use watchmesh_core::ChatMessage;

/// Messages kept per session.
pub const CHAT_HISTORY_LIMIT: usize = 500;

/// How an outgoing chat message left this peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRoute {
    /// Sent over `delivered` open chat channels; the relay was not used.
    Direct { delivered: usize },
    /// No channel was open, so it went out once as a relay broadcast.
    Relay,
}

/// Bounded chat log, oldest first.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    limit: usize,
    messages: VecDeque<ChatMessage>,
}

impl ChatHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            messages: VecDeque::new(),
        }
    }

    pub fn push(&mut self, msg: ChatMessage) {
        if self.messages.len() == self.limit {
            self.messages.pop_front();
        }
        self.messages.push_back(msg);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn latest(&self) -> Option<&ChatMessage> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(CHAT_HISTORY_LIMIT)
    }
}

/// Trimmed text, or `None` when nothing is left to send.
pub fn normalize_outgoing(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}
