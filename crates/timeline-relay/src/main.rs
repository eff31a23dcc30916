//! Timeline relay entry point.
//!
//! Services that cannot link `timeline-core` publish track requests on NATS.
//! The relay runs each one through the pipeline against the shared list
//! store and, when the request carries a reply subject, answers with a
//! delivery summary.
//!
//! # Architecture
//!
//! ```text
//! NATS (timeline.track) --> TrackMessage --> Tracker --> Redis lists
//!                                               \--> NATS (reply)
//! ```

mod error;
mod message;
mod nats;
mod relay;

use std::path::PathBuf;

use timeline_core::{TimelineConfig, Tracker};
use timeline_store::LogStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::RelayError;
use crate::nats::NatsClient;
use crate::relay::Relay;

/// Default configuration path when `TIMELINE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "timeline-config.yaml";

/// Application entry point.
///
/// Loads configuration, initializes logging, opens the store and NATS
/// connection, then relays requests until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if initialization fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("timeline-relay starting");
    info!(
        store_url = config.store.url,
        nats_url = config.relay.nats_url,
        subject = config.relay.subject,
        max_concurrency = config.fanout.max_concurrency,
        followers_relation = config.fanout.followers_relation,
        "configuration loaded"
    );

    run(&config).await?;
    info!("timeline-relay stopped");

    Ok(())
}

/// Open the store and NATS connection and relay until shutdown.
async fn run(config: &TimelineConfig) -> Result<(), RelayError> {
    let store = LogStore::connect_redis(&config.store.url, config.store.command_timeout()).await?;
    info!(backend = store.backend(), "list store connected");

    let nats = NatsClient::connect(&config.relay.nats_url).await?;
    let tracker = Tracker::new(store.clone(), config);
    let relay = Relay::new(nats, tracker, config.relay.subject.clone());

    tokio::select! {
        result = relay.run() => result?,
        () = shutdown_signal() => {}
    }

    if let Err(e) = relay.flush().await {
        warn!(error = %e, "failed to flush pending replies");
    }
    store.close().await?;
    Ok(())
}

/// Load configuration from `TIMELINE_CONFIG` or the default path.
///
/// A missing file yields the defaults (with environment overrides).
fn load_config() -> Result<TimelineConfig, RelayError> {
    let path = std::env::var("TIMELINE_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(TimelineConfig::from_file(&path)?)
    } else {
        Ok(TimelineConfig::parse("")?)
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
