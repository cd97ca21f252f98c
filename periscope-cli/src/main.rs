use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use periscope_client::core::{IceServerConfig, Identity};
use periscope_client::{
    ChannelPresentation, MediaConfig, Notification, Session, SessionConfig, WebRtcMediaEngine,
    WsTransport,
};
use periscope_relay::RelayService;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "periscope")]
#[command(about = "WebRTC viewing sessions over a pub/sub relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the WebSocket relay.
    Relay {
        #[arg(long, env = "PERISCOPE_BIND", default_value = "0.0.0.0:3000")]
        bind: String,
    },
    /// Join a room as a viewer and print what happens.
    Watch {
        /// Relay URL. Falls back to PERISCOPE_ADDRESS.
        #[arg(long)]
        address: Option<String>,

        /// Peers to offer to once joined. Without any, wait for offers.
        #[arg(long = "peer")]
        peers: Vec<String>,

        #[arg(long)]
        identity: Option<String>,

        #[arg(long)]
        publish_channel: Option<String>,

        #[arg(long)]
        subscribe_channel: Option<String>,

        #[arg(long)]
        video_source: Option<String>,

        /// STUN/TURN URLs. Defaults to a public STUN server.
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,

        /// Seconds before a stalled negotiation is dropped. 0 disables.
        #[arg(long)]
        negotiation_timeout: Option<u64>,
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
        Commands::Relay { bind } => run_relay(&bind).await,
        Commands::Watch {
            address,
            peers,
            identity,
            publish_channel,
            subscribe_channel,
            video_source,
            ice_servers,
            negotiation_timeout,
        } => {
            let mut config = SessionConfig::from_env()?;
            if let Some(address) = address {
                config.transport_address = address;
            }
            if let Some(identity) = identity {
                config.identity = Identity::from(identity);
            }
            if let Some(channel) = publish_channel {
                config.publish_channel = channel;
            }
            if let Some(channel) = subscribe_channel {
                config.subscribe_channel = channel;
            }
            if let Some(source) = video_source {
                config.video_source = source;
            }
            if let Some(secs) = negotiation_timeout {
                config.negotiation_timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }

            let media = if ice_servers.is_empty() {
                MediaConfig::default()
            } else {
                MediaConfig {
                    ice_servers: ice_servers.into_iter().map(IceServerConfig::stun).collect(),
                }
            };

            run_watch(config, media, peers).await
        }
    }
}

async fn run_relay(bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    let addr = listener.local_addr()?;

    println!("{}", "📡 Periscope relay".green().bold());
    println!("   🔌 ws://{addr}/ws");
    info!("Relay listening on {}", addr);

    periscope_relay::serve(listener, RelayService::new())
        .await
        .context("Relay stopped")
}

async fn run_watch(config: SessionConfig, media: MediaConfig, peers: Vec<String>) -> Result<()> {
    println!(
        "{} {} via {}",
        "🔭 Watching as".green().bold(),
        config.identity.to_string().bold(),
        config.transport_address.cyan()
    );

    let engine = WebRtcMediaEngine::new(media)?;
    let (presentation, mut notifications) = ChannelPresentation::new();
    let handle = Session::spawn(
        config,
        Arc::new(WsTransport::new()),
        Arc::new(engine),
        Arc::new(presentation),
    );

    handle.connect().await.context("Failed to connect")?;
    handle.join().await.context("Failed to join")?;
    println!("{}", "✨ Joined, waiting for streams (Ctrl+C to quit)".green());

    for peer in peers {
        if let Err(e) = handle.watch(peer.as_str()).await {
            println!("{} {}: {}", "✗".red(), peer, e);
        }
    }

    loop {
        tokio::select! {
            Some(notification) = notifications.recv() => print_notification(&notification),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("{}", "👋 Leaving".yellow());
    handle.shutdown().await;
    Ok(())
}

fn print_notification(notification: &Notification) {
    match notification {
        Notification::VideoTrackAdded { peer, track } => {
            println!("{} {} track {} ({})", "▶".green(), peer, track.id, track.kind);
        }
        Notification::VideoTrackRemoved { peer } => {
            println!("{} {} track removed", "■".yellow(), peer);
        }
        Notification::ConnectionStateChanged { peer, state } => {
            println!("{} {} is {}", "•".cyan(), peer, state);
        }
        Notification::ErrorOccurred {
            kind,
            peer,
            message,
        } => match peer {
            Some(peer) => println!("{} {:?} [{}]: {}", "✗".red(), kind, peer, message),
            None => println!("{} {:?}: {}", "✗".red(), kind, message),
        },
    }
}
