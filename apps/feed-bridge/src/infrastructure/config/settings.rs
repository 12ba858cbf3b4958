//! Relay Configuration Settings
//!
//! A small key/value resolver ([`ConfigMap`]) plus the typed [`Settings`] the
//! relay factory consumes. Required keys: `SECRET_KEY`, `FEED`, `MARKET`,
//! `BUFFER_SIZE`. Optional: `STREAM_URL` (overrides the derived endpoint).

use std::collections::BTreeMap;

/// Configuration keys the resolver knows about.
const KNOWN_KEYS: &[&str] = &["SECRET_KEY", "FEED", "MARKET", "BUFFER_SIZE", "STREAM_URL"];

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration key is missing.
    #[error("missing required configuration key: {0}")]
    MissingKey(String),

    /// A configuration key has an empty value.
    #[error("configuration key {0} cannot be empty")]
    EmptyValue(String),

    /// A configuration key has a value that cannot be parsed.
    #[error("configuration key {key} has invalid value: {value}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// The unparseable value.
        value: String,
    },
}

/// Flat key/value configuration source.
///
/// Backed by a plain map so tests and embedders can construct it directly;
/// [`ConfigMap::from_env`] snapshots the known keys from the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    entries: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Create an empty configuration map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the known configuration keys from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut map = Self::new();
        for key in KNOWN_KEYS {
            if let Ok(value) = std::env::var(key) {
                map.insert(*key, value);
            }
        }
        map
    }

    /// Insert a key/value pair.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Resolve a required key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] when absent and
    /// [`ConfigError::EmptyValue`] when present but empty.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        if value.is_empty() {
            return Err(ConfigError::EmptyValue(key.to_string()));
        }
        Ok(value)
    }

    /// Resolve an optional key. Empty values count as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Market data feed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Real-time feed.
    RealTime,
    /// Delayed feed.
    Delayed,
}

impl FeedKind {
    /// Parse a feed identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unknown identifiers.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_lowercase().as_str() {
            "realtime" => Ok(Self::RealTime),
            "delayed" => Ok(Self::Delayed),
            _ => Err(ConfigError::InvalidValue {
                key: "FEED".to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Get the feed name for stream URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RealTime => "realtime",
            Self::Delayed => "delayed",
        }
    }
}

/// Market a relay is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    /// Equity market.
    Stocks,
    /// Crypto market.
    Crypto,
}

impl Market {
    /// Parse a market identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unknown identifiers.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_lowercase().as_str() {
            "stocks" => Ok(Self::Stocks),
            "crypto" => Ok(Self::Crypto),
            _ => Err(ConfigError::InvalidValue {
                key: "MARKET".to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Get the market name for stream URLs and topic keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stocks => "stocks",
            Self::Crypto => "crypto",
        }
    }
}

/// API secret used as the subscription approval key.
///
/// The `Debug` implementation redacts the value for safe logging.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret for wire use.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"[REDACTED]").finish()
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API secret / approval key.
    pub secret_key: SecretKey,
    /// Feed tier.
    pub feed: FeedKind,
    /// Market scope.
    pub market: Market,
    /// Consumer channel capacity.
    pub buffer_size: usize,
    stream_url: Option<String>,
}

impl Settings {
    /// Resolve settings from a configuration map.
    ///
    /// Each required key fails independently: the first missing or malformed
    /// one aborts resolution.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending key.
    pub fn resolve(config: &ConfigMap) -> Result<Self, ConfigError> {
        let secret_key = SecretKey::new(config.require("SECRET_KEY")?);
        let feed = FeedKind::parse(config.require("FEED")?)?;
        let market = Market::parse(config.require("MARKET")?)?;

        let raw_buffer = config.require("BUFFER_SIZE")?;
        let buffer_size: usize =
            raw_buffer
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "BUFFER_SIZE".to_string(),
                    value: raw_buffer.to_string(),
                })?;
        if buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BUFFER_SIZE".to_string(),
                value: raw_buffer.to_string(),
            });
        }

        Ok(Self {
            secret_key,
            feed,
            market,
            buffer_size,
            stream_url: config.get("STREAM_URL").map(ToString::to_string),
        })
    }

    /// Resolve settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending key.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(&ConfigMap::from_env())
    }

    /// Get the upstream stream URL, derived from feed and market unless
    /// overridden via `STREAM_URL`.
    #[must_use]
    pub fn stream_url(&self) -> String {
        self.stream_url.clone().unwrap_or_else(|| {
            format!(
                "wss://stream.marketpulse.io/v1/{}/{}",
                self.feed.as_str(),
                self.market.as_str()
            )
        })
    }
}
