//! Feed Bridge Binary
//!
//! Relays trades from the upstream push feed onto the internal typed stream
//! and logs them until interrupted. The configured market selects the trade
//! shape the relay is instantiated for.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin feed-bridge
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `SECRET_KEY`: Subscription approval key
//! - `FEED`: Feed tier - "realtime" | "delayed"
//! - `MARKET`: Market scope - "stocks" | "crypto"
//! - `BUFFER_SIZE`: Consumer channel capacity
//!
//! ## Optional
//! - `STREAM_URL`: Override the derived WebSocket endpoint
//! - `RUST_LOG`: Log level (default: info)

use std::time::Duration;

use feed_bridge::{
    ConfigMap, CryptoTrade, EquityTrade, Market, Settings, TickRelay, TradeShape, init_telemetry,
};
use tokio::signal;

/// Deadline for the initial connectivity check.
const PING_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let _ = dotenvy::dotenv();
    init_telemetry();

    tracing::info!("Starting feed bridge");

    let config = ConfigMap::from_env();
    let settings = Settings::resolve(&config)?;
    tracing::info!(
        feed = settings.feed.as_str(),
        market = settings.market.as_str(),
        buffer_size = settings.buffer_size,
        "Configuration loaded"
    );

    match settings.market {
        Market::Stocks => run::<EquityTrade>(&config).await,
        Market::Crypto => run::<CryptoTrade>(&config).await,
    }
}

/// Drive one relay lifecycle for the configured trade shape.
async fn run<T: TradeShape + std::fmt::Debug>(config: &ConfigMap) -> anyhow::Result<()> {
    let mut relay = TickRelay::<T>::from_config(config)?;

    relay.ping(PING_DEADLINE).await?;
    tracing::info!("Upstream reachable");

    let mut trades = relay.subscribe().await?;
    tracing::info!(channel = %T::channel(), "Relay subscribed");

    loop {
        tokio::select! {
            () = shutdown_signal() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            trade = trades.recv() => match trade {
                Some(trade) => tracing::info!(trade = ?trade, "trade"),
                None => {
                    tracing::warn!("Trade stream ended");
                    break;
                }
            }
        }
    }

    relay.close().await;
    if let Some(cause) = relay.termination() {
        tracing::info!(cause = %cause, "Relay stopped");
    }

    Ok(())
}

/// Wait for SIGTERM or SIGINT.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
