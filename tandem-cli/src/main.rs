use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use tandem::RoomId;
use tandem::peer::{
    ConnectionConfig, LocalMedia, LocalTrack, RelayClient, RtcConnectionFactory, Session,
    SessionEvent,
};
use tandem::server::{DEFAULT_ADDR, ServerConfig, serve};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const STREAM_ID: &str = "tandem";

#[derive(Parser)]
#[command(name = "tandem", version, about = "Two-party calls over a room relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the room relay.
    Serve {
        #[arg(long, env = "TANDEM_ADDR", default_value = DEFAULT_ADDR)]
        addr: SocketAddr,
    },

    /// Join a room and chat with the other side from the terminal.
    Join {
        #[arg(long, env = "TANDEM_SERVER", default_value = "127.0.0.1:3000")]
        server: String,

        /// Six-digit room; a fresh one is generated when missing or malformed.
        #[arg(long, env = "TANDEM_ROOM")]
        room: Option<String>,

        #[arg(long)]
        no_audio: bool,

        #[arg(long)]
        no_video: bool,

        #[arg(long, env = "TURN_URL")]
        turn_url: Option<String>,

        #[arg(long, env = "TURN_USERNAME")]
        turn_username: Option<String>,

        #[arg(long, env = "TURN_CREDENTIAL")]
        turn_credential: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { addr } => serve(ServerConfig { addr }).await,

        Commands::Join {
            server,
            room,
            no_audio,
            no_video,
            turn_url,
            turn_username,
            turn_credential,
        } => {
            let mut tracks = Vec::new();
            if !no_audio {
                tracks.push(LocalTrack::audio(STREAM_ID));
            }
            if !no_video {
                tracks.push(LocalTrack::video(STREAM_ID));
            }
            let config = ConnectionConfig::with_turn(turn_url, turn_username, turn_credential);

            LocalSet::new()
                .run_until(join_call(server, room, LocalMedia::new(tracks), config))
                .await
        }
    }
}

async fn join_call(
    server: String,
    room: Option<String>,
    media: LocalMedia,
    config: ConnectionConfig,
) -> Result<()> {
    let (room, created) = RoomId::from_fragment(room.as_deref());
    if created {
        println!("{} {}", "Created room".green().bold(), room.to_string().bold());
    } else {
        println!("{} {}", "Joining room".green().bold(), room.to_string().bold());
    }

    let (sink, relay_rx) = RelayClient::new(server.as_str())
        .join(&room)
        .await
        .context("Failed to reach the relay")?;
    info!("Joined room {} on {}", room, server);

    let (session, events) = Session::start(RtcConnectionFactory::new(config), sink, media)
        .await
        .context("Failed to start session")?;
    let handle = session.handle();

    tokio::task::spawn_local(session.run(relay_rx));
    tokio::task::spawn_local(print_events(events));

    println!("{}", "Type to chat, /leave to hang up.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(text) if text.trim() == "/leave" => break,
                    Some(text) if text.trim().is_empty() => {}
                    Some(text) => {
                        if let Err(e) = handle.send_chat(&text).await {
                            warn!("Chat message not sent: {}", e);
                            println!("{} {}", "chat not sent:".red(), e);
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Hanging up");
    handle.leave().await;
    println!("{}", "Left the call.".yellow());
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::RoleAssigned(role) => {
                println!("{} {}", "role:".dimmed(), role);
            }
            SessionEvent::PeerJoined => println!("{}", "peer joined".green()),
            SessionEvent::PeerLeft => println!("{}", "peer left".yellow()),
            SessionEvent::RemoteTrack(track) => {
                println!("{} {:?} track {}", "receiving".cyan(), track.kind, track.id);
            }
            SessionEvent::DataChannel { label } => {
                println!("{} {}", "channel opened:".dimmed(), label);
            }
            SessionEvent::Chat(text) => println!("{} {}", "peer:".cyan().bold(), text),
            SessionEvent::Fault(fault) => println!("{}", fault.to_string().red()),
        }
    }
}
