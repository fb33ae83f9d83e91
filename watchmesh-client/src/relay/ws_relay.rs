use crate::error::SessionError;
use crate::relay::RelayChannel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use watchmesh_core::{ClientMessage, RelayMessage};

enum Outgoing {
    Frame(ClientMessage),
    Close,
}

/// Relay client over a WebSocket.
pub struct WsRelay {
    outbox: mpsc::UnboundedSender<Outgoing>,
    reader: AbortHandle,
}

impl WsRelay {
    /// Open the socket and start the reader/writer tasks. Decoded frames from
    /// the relay arrive on the returned receiver, which closes when the socket
    /// does.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<RelayMessage>)> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to relay at {}", url))?;
        info!("Connected to relay {}", url);

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outgoing>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<RelayMessage>();

        tokio::spawn(async move {
            while let Some(outgoing) = out_rx.recv().await {
                let msg = match outgoing {
                    Outgoing::Frame(msg) => msg,
                    Outgoing::Close => break,
                };
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize client message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json)).await {
                    warn!("Relay write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Relay writer finished");
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<RelayMessage>(&text) {
                        Ok(msg) => {
                            if in_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid RelayMessage: {:?}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay read failed: {}", e);
                        break;
                    }
                }
            }
            info!("Relay socket closed");
        });

        Ok((
            Self {
                outbox: out_tx,
                reader: reader.abort_handle(),
            },
            in_rx,
        ))
    }
}

#[async_trait]
impl RelayChannel for WsRelay {
    async fn send(&self, msg: ClientMessage) -> Result<(), SessionError> {
        self.outbox
            .send(Outgoing::Frame(msg))
            .map_err(|_| SessionError::Relay("relay connection is closed".into()))
    }

    async fn disconnect(&self) {
        let _ = self.outbox.send(Outgoing::Close);
        self.reader.abort();
    }
}

impl Drop for WsRelay {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
