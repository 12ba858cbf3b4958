//! Tracing Initialization
//!
//! Configures the global tracing subscriber with an environment filter.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level filter (default: info)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
///
/// Safe to call more than once; only the first call installs the global
/// subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
