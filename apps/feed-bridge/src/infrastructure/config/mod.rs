//! Configuration
//!
//! Key/value resolution and typed settings for the relay, loaded from
//! environment variables or supplied explicitly (tests, embedding).

mod settings;

pub use settings::{ConfigError, ConfigMap, FeedKind, Market, SecretKey, Settings};
