//! Trade Message Shapes
//!
//! The closed set of trade records a relay can be parameterized over, the
//! [`FeedPayload`] union delivered by a feed connection, and the
//! [`TradeShape`] narrowing contract that ties the two together.
//!
//! A relay instance is built for exactly one shape. Anything the feed
//! delivers that does not narrow to that shape terminates the relay rather
//! than being silently dropped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Feed channel a trade shape is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedChannel {
    /// Real-time equity trade executions.
    EquityTrades,
    /// Real-time crypto trade executions.
    CryptoTrades,
}

impl FeedChannel {
    /// Get the channel name for logging and topic construction.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EquityTrades => "equity-trades",
            Self::CryptoTrades => "crypto-trades",
        }
    }
}

impl std::fmt::Display for FeedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Real-time equity trade execution.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "equity_trade",
///   "symbol": "AAPL",
///   "price": 189.55,
///   "size": 120,
///   "exchange": "X",
///   "timestamp": "2024-03-11T13:35:35.133Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityTrade {
    /// Ticker symbol (e.g., "AAPL").
    pub symbol: String,

    /// Execution price.
    pub price: Decimal,

    /// Execution size (shares).
    pub size: i64,

    /// Exchange code where the trade executed.
    pub exchange: String,

    /// Execution timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Real-time crypto trade execution.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "crypto_trade",
///   "pair": "BTC-USD",
///   "price": 64123.5,
///   "size": 0.25,
///   "exchange": "CBSE",
///   "timestamp": "2024-03-11T13:35:35.133Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoTrade {
    /// Trading pair (e.g., "BTC-USD").
    pub pair: String,

    /// Execution price.
    pub price: Decimal,

    /// Execution size (base units, fractional).
    pub size: Decimal,

    /// Exchange code where the trade executed.
    pub exchange: String,

    /// Execution timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Union of all trade shapes a feed connection can deliver.
///
/// The `type` tag discriminates shapes on the wire, so a payload frame
/// decodes directly into this enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedPayload {
    /// An equity trade execution.
    #[serde(rename = "equity_trade")]
    Equity(EquityTrade),
    /// A crypto trade execution.
    #[serde(rename = "crypto_trade")]
    Crypto(CryptoTrade),
}

impl FeedPayload {
    /// Get the channel this payload belongs to.
    #[must_use]
    pub const fn channel(&self) -> FeedChannel {
        match self {
            Self::Equity(_) => FeedChannel::EquityTrades,
            Self::Crypto(_) => FeedChannel::CryptoTrades,
        }
    }
}

/// Contract tying a concrete trade shape to its feed channel.
///
/// A relay is parameterized by one implementor for its whole lifetime:
/// `channel()` names the topic it subscribes to, `narrow()` filters inbound
/// payloads down to the configured shape. A `None` from `narrow` is a
/// relay-terminating anomaly, not a skip.
pub trait TradeShape: Send + Sized + 'static {
    /// The feed channel this shape is published on.
    fn channel() -> FeedChannel;

    /// Narrow a feed payload to this shape, or `None` on a mismatch.
    fn narrow(payload: FeedPayload) -> Option<Self>;
}

impl TradeShape for EquityTrade {
    fn channel() -> FeedChannel {
        FeedChannel::EquityTrades
    }

    fn narrow(payload: FeedPayload) -> Option<Self> {
        match payload {
            FeedPayload::Equity(trade) => Some(trade),
            FeedPayload::Crypto(_) => None,
        }
    }
}

impl TradeShape for CryptoTrade {
    fn channel() -> FeedChannel {
        FeedChannel::CryptoTrades
    }

    fn narrow(payload: FeedPayload) -> Option<Self> {
        match payload {
            FeedPayload::Crypto(trade) => Some(trade),
            FeedPayload::Equity(_) => None,
        }
    }
}
