//! Port Interfaces
//!
//! Defines the feed-connection capability the relay core consumes, following
//! the Hexagonal Architecture pattern. Infrastructure adapters (and test
//! doubles) implement [`FeedConnection`]; the relay never touches a socket
//! directly.
//!
//! The capability delivers a terminal signal when the connection is lost:
//! either the output stream closes or a value arrives on the error stream.
//! Whichever signal the relay observes first wins.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::trades::{FeedChannel, FeedPayload};

/// Capacity of a connection's error stream. Errors are terminal, so a small
/// buffer is enough to never drop the first one.
const ERROR_STREAM_CAPACITY: usize = 8;

/// Errors surfaced by a feed connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// Establishing the network-level connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An operation required an established connection.
    #[error("not connected")]
    NotConnected,

    /// The connection was closed by the remote end.
    #[error("connection closed")]
    ConnectionClosed,

    /// The subscription request was rejected or could not be sent.
    #[error("subscription rejected: {0}")]
    SubscriptionRejected(String),

    /// The output/error streams were already handed over.
    #[error("output streams already taken")]
    StreamsTaken,
}

/// Write side of a connection's output and error streams.
///
/// Held by the connection's read pump. Dropping both senders closes the
/// streams, which consumers observe as the terminal signal.
#[derive(Debug)]
pub struct FeedSenders {
    /// Decoded payloads, in delivery order.
    pub output: mpsc::Sender<FeedPayload>,
    /// Terminal connection errors.
    pub errors: mpsc::Sender<FeedError>,
}

/// Read side of a connection's output and error streams.
///
/// Handed over to the relay task exactly once via
/// [`FeedConnection::take_streams`].
#[derive(Debug)]
pub struct FeedStreams {
    /// Decoded payloads, in delivery order.
    pub output: mpsc::Receiver<FeedPayload>,
    /// Terminal connection errors.
    pub errors: mpsc::Receiver<FeedError>,
}

impl FeedStreams {
    /// Create a connected sender/receiver pair with the given output capacity.
    #[must_use]
    pub fn channel(output_capacity: usize) -> (FeedSenders, Self) {
        let (output_tx, output_rx) = mpsc::channel(output_capacity);
        let (error_tx, error_rx) = mpsc::channel(ERROR_STREAM_CAPACITY);
        (
            FeedSenders {
                output: output_tx,
                errors: error_tx,
            },
            Self {
                output: output_rx,
                errors: error_rx,
            },
        )
    }
}

/// Capability owned exclusively by a relay: the physical real-time connection.
///
/// Implementations own the socket, message decoding, and the push-style
/// output/error surface. The relay is the only caller; no other component may
/// touch the handle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedConnection: Send + Sync {
    /// Establish the network-level connection.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] if the connection cannot be established.
    async fn connect(&self) -> Result<(), FeedError>;

    /// Issue a topic subscription request for the given channel.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] if the request cannot be issued; the caller
    /// surfaces it verbatim and starts no relay task.
    async fn subscribe(&self, channel: FeedChannel) -> Result<(), FeedError>;

    /// Hand over the output and error streams.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::StreamsTaken`] after the first call.
    fn take_streams(&self) -> Result<FeedStreams, FeedError>;

    /// Close the connection. Further reads deliver the terminal signal.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trades::EquityTrade;
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn streams_deliver_in_order() {
        let (senders, mut streams) = FeedStreams::channel(4);

        for size in 1..=3 {
            let trade = EquityTrade {
                symbol: "AAPL".to_string(),
                price: Decimal::new(18955, 2),
                size,
                exchange: "X".to_string(),
                timestamp: Utc::now(),
            };
            senders
                .output
                .send(FeedPayload::Equity(trade))
                .await
                .unwrap();
        }

        for expected in 1..=3 {
            match streams.output.recv().await.unwrap() {
                FeedPayload::Equity(trade) => assert_eq!(trade.size, expected),
                FeedPayload::Crypto(_) => panic!("expected equity payload"),
            }
        }
    }

    #[tokio::test]
    async fn dropping_senders_closes_streams() {
        let (senders, mut streams) = FeedStreams::channel(4);
        drop(senders);

        assert!(streams.output.recv().await.is_none());
        assert!(streams.errors.recv().await.is_none());
    }
}
