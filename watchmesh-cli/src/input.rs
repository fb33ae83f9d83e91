use anyhow::{Context, Result, bail};

/// Step used by `/fwd` and `/back`, in seconds.
pub const SKIP_SECS: f64 = 10.0;

/// One line typed into an interactive session.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    TakeHost,
    Load(String),
    Play,
    Pause,
    Seek(f64),
    SeekBy(f64),
    Status,
    Help,
    Quit,
    Chat(String),
    Empty,
}

impl Input {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Input::Empty);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Input::Chat(line.to_owned()));
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        let input = match name {
            "host" => Input::TakeHost,
            "load" => {
                if arg.is_empty() {
                    bail!("Usage: /load <url>");
                }
                Input::Load(arg.to_owned())
            }
            "play" => Input::Play,
            "pause" => Input::Pause,
            "seek" => {
                let secs: f64 = arg
                    .parse()
                    .with_context(|| format!("Usage: /seek <secs> (got '{}')", arg))?;
                if !secs.is_finite() {
                    bail!("Usage: /seek <secs>");
                }
                Input::Seek(secs)
            }
            "fwd" => Input::SeekBy(SKIP_SECS),
            "back" => Input::SeekBy(-SKIP_SECS),
            "status" => Input::Status,
            "help" => Input::Help,
            "quit" | "exit" => Input::Quit,
            other => bail!("Unknown command /{}", other),
        };
        Ok(input)
    }
}

pub const HELP: &str = "\
/host           take over as host
/load <url>     load a video (host)
/play, /pause   (host)
/seek <secs>    jump to a position (host)
/fwd, /back     skip 10 seconds (host)
/status         show room and playback state
/quit           leave
anything else is sent as chat";
