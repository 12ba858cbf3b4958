#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access
    )
)]

//! Feed Bridge - Typed Market Data Relay
//!
//! A normalization layer between an external real-time market-data push feed
//! and a single internal consumer-facing stream. The core is [`TickRelay`]: a
//! typed subscription adapter that owns one upstream connection, subscribes to
//! a trade channel, and republishes inbound messages onto an internally owned,
//! type-safe, backpressure-bounded channel with deterministic liveness
//! (`ping`) and shutdown (`close`) control.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Trade message shapes and the typed narrowing contract
//!   - `trades`: Equity/crypto trade records, [`FeedPayload`], [`TradeShape`]
//!
//! - **Application**: The relay core and its port definitions
//!   - `ports`: [`FeedConnection`] capability consumed by the relay
//!   - `relay`: [`TickRelay`] lifecycle (construct, ping, subscribe, close)
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `upstream`: WebSocket connection, wire messages, handshake validation
//!   - `config`: Key/value resolution and typed settings
//!   - `telemetry`: Tracing subscriber initialization
//!
//! # Data Flow
//!
//! ```text
//! Upstream WS ──► FeedConnection ──► TickRelay<T> ──► mpsc::Receiver<T> ──► Consumer
//!                 (output/error)     (narrow + relay)   (bounded, typed)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Trade message shapes with no transport dependencies.
pub mod domain;

/// Application layer - Relay core and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::trades::{CryptoTrade, EquityTrade, FeedChannel, FeedPayload, TradeShape};

// Application core
pub use application::ports::{FeedConnection, FeedError, FeedSenders, FeedStreams};
pub use application::relay::{RelayError, RelayTermination, TickRelay};

// Infrastructure config
pub use infrastructure::config::{ConfigError, ConfigMap, FeedKind, Market, SecretKey, Settings};

// Upstream adapter (for integration tests and binary wiring)
pub use infrastructure::upstream::{
    ApprovalKeyRequest, ApprovalKeyResponse, HandshakeAck, RegistrationRequest, UpstreamConfig,
    UpstreamConnection, confirmed_topic,
};

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
