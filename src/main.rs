use peercast::application::{CloseReason, LocalMedia, LoopbackController, NegotiationController};
use peercast::config::Config;
use peercast::infrastructure::media::SyntheticCapture;
use peercast::infrastructure::webrtc::RtcPeerFactory;
use peercast::interface::SignalingLink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, Level};
use tracing_subscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting Peercast");

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded: {:?}", config);

    // `peercast loopback` wires two local peers directly; the default mode
    // negotiates through the relay
    let loopback = std::env::args().nth(1).is_some_and(|arg| arg == "loopback");
    if loopback {
        run_loopback(&config).await
    } else {
        run_relay(&config).await
    }
}

async fn run_relay(config: &Config) -> anyhow::Result<()> {
    let link = SignalingLink::connect(&config.signaling.url)
        .await?
        .with_ping_interval(Duration::from_secs(config.signaling.ping_interval_secs));

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let link_task = tokio::spawn(link.run(outbound_rx, inbound_tx, shutdown_rx));

    let media = SyntheticCapture::capture();
    let factory = Arc::new(
        RtcPeerFactory::new(config.ice.stun_servers.clone()).with_media(media.clone()),
    );

    let mut controller = NegotiationController::new(factory, outbound_tx, shutdown_tx);
    info!(session = %controller.session_id(), "session created");
    controller.open(Box::new(media));

    tokio::select! {
        _ = controller.run(inbound_rx) => {
            info!("session ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    // No-op if the session already closed itself
    controller.stop(CloseReason::Local).await;
    let _ = link_task.await;
    Ok(())
}

async fn run_loopback(config: &Config) -> anyhow::Result<()> {
    let media = SyntheticCapture::capture();
    let caller = Arc::new(
        RtcPeerFactory::new(config.ice.stun_servers.clone()).with_media(media.clone()),
    );
    let callee = Arc::new(RtcPeerFactory::new(config.ice.stun_servers.clone()));

    let mut controller = LoopbackController::new(caller, callee);
    controller.start().await?;
    info!("loopback negotiation complete, waiting for connection");

    tokio::select! {
        _ = controller.process_events() => {
            info!("loopback session finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    controller.stop().await;
    media.stop();
    Ok(())
}
