mod config;
mod input;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::info;
use watchmesh_client::{
    SessionConfig, SessionError, SessionEvent, SessionHandle, SystemClock, VirtualPlayer,
};
use watchmesh_core::{IceServerConfig, SourceType, extract_youtube_id};
use watchmesh_relay::RelayConfig;

use crate::input::{HELP, Input};

#[derive(Parser)]
#[command(name = "watchmesh")]
#[command(about = "Watch videos together over a WebRTC mesh", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay
    Relay {
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// STUN/TURN url announced to clients, repeatable
        #[arg(long)]
        stun: Vec<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Join a room as a headless peer
    Join {
        #[arg(long, default_value = "ws://127.0.0.1:3001/ws")]
        url: String,

        #[arg(short, long)]
        room: Option<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Relay { bind, stun, config } => cmd_relay(bind, stun, config).await,
        Commands::Join { url, room, config } => cmd_join(url, room, config).await,
    }
}

async fn cmd_relay(
    bind: Option<SocketAddr>,
    stun: Vec<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut config: RelayConfig = config::load_or_default(config.as_deref())?;
    if let Some(bind) = bind {
        config.bind = bind;
    }
    config
        .ice_servers
        .extend(stun.into_iter().map(IceServerConfig::stun));

    println!("{} {}", "Starting relay on".green().bold(), config.bind);
    watchmesh_relay::serve(config).await
}

async fn cmd_join(url: String, room: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let config: SessionConfig = config::load_or_default(config.as_deref())?;
    let room = match room {
        Some(room) => room,
        None => prompt_room().await?,
    };

    let player = Box::new(VirtualPlayer::new(Arc::new(SystemClock)));
    let (handle, events) = watchmesh_client::connect(&url, config, player)
        .await
        .with_context(|| format!("Could not reach relay at {}", url))?;

    let joined = handle.join(room.as_str()).await?;
    println!(
        "{} {} as {}{}",
        "Joined".green().bold(),
        joined.room.to_string().bright_cyan(),
        joined.self_id.short().bright_yellow(),
        if joined.is_host { " (host)" } else { "" }
    );
    println!("{}", "Type /help for commands".dimmed());

    let event_task = tokio::spawn(print_events(events));
    let input_task = tokio::spawn(read_input(handle.clone()));

    tokio::select! {
        _ = event_task => {}
        _ = input_task => {}
    }

    if !handle.is_closed() {
        let _ = handle.leave().await;
    }
    Ok(())
}

async fn prompt_room() -> Result<String> {
    let room = tokio::task::spawn_blocking(|| {
        dialoguer::Input::<String>::new()
            .with_prompt("Room")
            .default("lobby".into())
            .interact_text()
    })
    .await??;
    Ok(room)
}

async fn read_input(handle: SessionHandle) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let input = match Input::parse(&line) {
            Ok(input) => input,
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                continue;
            }
        };

        if input == Input::Quit {
            println!("Leaving...");
            break;
        }
        if let Err(e) = run_input(&handle, input).await {
            println!("{} {}", "✗".red(), e);
            if matches!(e, SessionError::SessionClosed) {
                break;
            }
        }
    }
}

async fn run_input(handle: &SessionHandle, input: Input) -> Result<(), SessionError> {
    match input {
        Input::TakeHost => handle.take_host().await?,
        Input::Load(url) => handle.load(url).await?,
        Input::Play => handle.play().await?,
        Input::Pause => handle.pause().await?,
        Input::Seek(secs) => handle.seek(secs).await?,
        Input::SeekBy(delta) => handle.seek_by(delta).await?,
        Input::Status => print_status(handle).await?,
        Input::Help => println!("{}", HELP),
        Input::Chat(text) => {
            handle.send_chat(text).await?;
        }
        Input::Quit | Input::Empty => {}
    }
    Ok(())
}

async fn print_status(handle: &SessionHandle) -> Result<(), SessionError> {
    let snap = handle.snapshot().await?;
    let room = snap.room.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
    let host = snap.host.as_ref().map(|h| h.short()).unwrap_or("none");

    println!("Room:     {}", room.bright_cyan());
    println!("Host:     {}{}", host, if snap.is_host { " (you)" } else { "" });
    println!("Source:   {}", source_label(snap.source.as_ref()));
    println!(
        "Playback: {:.1}s {}",
        snap.position,
        if snap.paused { "paused" } else { "playing" }
    );
    println!("Channels: {}/{}", snap.open_channels, snap.peers.len());
    for (peer_id, state) in &snap.peers {
        println!("  • {} {:?}", peer_id.short(), state);
    }
    Ok(())
}

fn source_label(source: Option<&(SourceType, String)>) -> String {
    match source {
        None => "-".into(),
        Some((SourceType::Youtube, url)) => match extract_youtube_id(url) {
            Some(id) => format!("youtube {}", id),
            None => format!("youtube {}", url),
        },
        Some((SourceType::Url, url)) => url.clone(),
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::ChatReceived(msg) => {
                println!("{} {}", format!("[{}]", msg.from.short()).bright_cyan(), msg.text);
            }
            SessionEvent::PeerJoined(peer_id) => {
                println!("{} {} joined", "→".green(), peer_id.short());
            }
            SessionEvent::PeerLeft(peer_id) => {
                println!("{} {} left", "←".yellow(), peer_id.short());
            }
            SessionEvent::PeerConnected(peer_id) => {
                println!("{} connected to {}", "✓".green(), peer_id.short());
            }
            SessionEvent::PeerRemoved(peer_id) => {
                info!("Connection to {:?} closed", peer_id);
            }
            SessionEvent::HostChanged(Some(host)) => {
                println!("{} {} is now host", "★".bright_yellow(), host.short());
            }
            SessionEvent::HostChanged(None) => {
                println!("{} host left, /host to take over", "★".bright_yellow());
            }
            SessionEvent::WatchApplied { from, action } => {
                println!("{} {} by {}", "▶".bright_magenta(), action, from.short());
            }
            SessionEvent::DriftCorrected { target, .. } => {
                info!("Resynced playback to {:.2}s", target);
            }
            SessionEvent::StreamUpdated { peer_id, stream } => {
                info!("{:?} now sends {} track(s)", peer_id, stream.tracks().len());
            }
            SessionEvent::RelayLost => {
                println!("{}", "Relay connection lost".red().bold());
                break;
            }
            SessionEvent::Left => break,
            SessionEvent::Welcome(_)
            | SessionEvent::Joined(_)
            | SessionEvent::ChannelOpened(_)
            | SessionEvent::ChannelClosed(_) => {}
        }
    }
}
