//! Relay Lifecycle Integration Tests
//!
//! Drives a `TickRelay` against a scripted feed connection: ordered relay,
//! shape-mismatch termination, backpressure, and deterministic shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::time::timeout;
use tokio_test::assert_ok;

use feed_bridge::{
    CryptoTrade, EquityTrade, FeedChannel, FeedConnection, FeedError, FeedPayload, FeedSenders,
    FeedStreams, RelayError, RelayTermination, TickRelay,
};

/// Feed connection driven entirely by the test through the senders half.
struct ScriptedFeed {
    streams: Mutex<Option<FeedStreams>>,
    subscribe_error: Mutex<Option<FeedError>>,
}

impl ScriptedFeed {
    /// Create a scripted feed whose output stream has the given capacity.
    fn with_capacity(output_capacity: usize) -> (Arc<Self>, FeedSenders) {
        let (senders, streams) = FeedStreams::channel(output_capacity);
        let feed = Arc::new(Self {
            streams: Mutex::new(Some(streams)),
            subscribe_error: Mutex::new(None),
        });
        (feed, senders)
    }

    fn reject_subscribe_with(&self, error: FeedError) {
        *self.subscribe_error.lock() = Some(error);
    }
}

#[async_trait]
impl FeedConnection for ScriptedFeed {
    async fn connect(&self) -> Result<(), FeedError> {
        Ok(())
    }

    async fn subscribe(&self, _channel: FeedChannel) -> Result<(), FeedError> {
        match self.subscribe_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn take_streams(&self) -> Result<FeedStreams, FeedError> {
        self.streams.lock().take().ok_or(FeedError::StreamsTaken)
    }

    async fn close(&self) {}
}

fn equity(seq: i64) -> FeedPayload {
    FeedPayload::Equity(EquityTrade {
        symbol: "AAPL".to_string(),
        price: Decimal::new(18955, 2),
        size: seq,
        exchange: "X".to_string(),
        timestamp: Utc::now(),
    })
}

fn crypto() -> FeedPayload {
    FeedPayload::Crypto(CryptoTrade {
        pair: "BTC-USD".to_string(),
        price: Decimal::new(641235, 1),
        size: Decimal::new(25, 2),
        exchange: "CBSE".to_string(),
        timestamp: Utc::now(),
    })
}

// =============================================================================
// Relay Ordering
// =============================================================================

#[tokio::test]
async fn matching_shapes_relayed_in_delivery_order() {
    let (feed, senders) = ScriptedFeed::with_capacity(16);
    let mut relay = TickRelay::<EquityTrade>::with_connection(feed, 16);

    assert_ok!(relay.ping(Duration::from_secs(1)).await);
    let mut trades = relay.subscribe().await.unwrap();

    for seq in 1..=3 {
        senders.output.send(equity(seq)).await.unwrap();
    }

    for expected in 1..=3 {
        let trade = timeout(Duration::from_secs(1), trades.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trade.size, expected);
    }

    // Still relaying; no termination recorded.
    assert!(relay.termination().is_none());

    relay.close().await;
}

#[tokio::test]
async fn mismatched_shape_stops_relay_without_partial_message() {
    let (feed, senders) = ScriptedFeed::with_capacity(16);
    let mut relay = TickRelay::<EquityTrade>::with_connection(feed, 16);
    let mut trades = relay.subscribe().await.unwrap();

    senders.output.send(equity(1)).await.unwrap();
    senders.output.send(crypto()).await.unwrap();
    senders.output.send(equity(2)).await.unwrap();

    let first = timeout(Duration::from_secs(1), trades.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.size, 1);

    // The mismatch ends the stream; the trailing equity trade is never
    // delivered and nothing garbled appears.
    assert!(
        timeout(Duration::from_secs(1), trades.recv())
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(relay.termination(), Some(RelayTermination::ShapeMismatch));

    relay.close().await;
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn close_joins_relay_and_ends_stream() {
    let (feed, senders) = ScriptedFeed::with_capacity(16);
    let mut relay = TickRelay::<EquityTrade>::with_connection(feed, 16);
    let mut trades = relay.subscribe().await.unwrap();

    senders.output.send(equity(1)).await.unwrap();
    senders.output.send(equity(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    relay.close().await;
    assert_eq!(relay.termination(), Some(RelayTermination::Cancelled));

    // The relay task is gone: the feed can no longer push anything.
    assert!(senders.output.send(equity(3)).await.is_err());

    // Already-relayed messages drain, then end-of-stream. Nothing else ever
    // appears.
    assert_eq!(trades.recv().await.unwrap().size, 1);
    assert_eq!(trades.recv().await.unwrap().size, 2);
    assert!(trades.recv().await.is_none());
}

#[tokio::test]
async fn close_waits_for_consumer_to_drain_blocked_send() {
    let (feed, senders) = ScriptedFeed::with_capacity(16);
    let mut relay = TickRelay::<EquityTrade>::with_connection(feed, 1);
    let mut trades = relay.subscribe().await.unwrap();

    // First trade fills the consumer channel; the second leaves the relay
    // blocked mid-send.
    senders.output.send(equity(1)).await.unwrap();
    senders.output.send(equity(2)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let close_task = tokio::spawn(async move {
        relay.close().await;
        relay
    });

    // Cancellation cannot interrupt the blocked send, so close stays pending
    // until the consumer frees a slot.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!close_task.is_finished());

    assert_eq!(trades.recv().await.unwrap().size, 1);

    let relay = timeout(Duration::from_secs(1), close_task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(relay.termination(), Some(RelayTermination::Cancelled));

    // The blocked send completed before cancellation was observed: no value
    // was lost.
    assert_eq!(trades.recv().await.unwrap().size, 2);
    assert!(trades.recv().await.is_none());
}

// =============================================================================
// Backpressure
// =============================================================================

#[tokio::test]
async fn full_channel_stalls_relay_then_resumes_losslessly() {
    // Feed-side buffer of one so the stall is observable from the senders.
    let (feed, senders) = ScriptedFeed::with_capacity(1);
    let mut relay = TickRelay::<EquityTrade>::with_connection(feed, 2);
    let mut trades = relay.subscribe().await.unwrap();

    // Two land in the consumer channel, one sits in the relay's blocked
    // send, one fills the feed buffer.
    for seq in 1..=4 {
        senders.output.send(equity(seq)).await.unwrap();
    }

    // With nobody draining, the pipeline is wedged: the fifth send cannot
    // be accepted.
    assert!(
        timeout(Duration::from_millis(100), senders.output.send(equity(5)))
            .await
            .is_err()
    );

    // Draining one slot unwedges the relay and the fifth send goes through.
    assert_eq!(trades.recv().await.unwrap().size, 1);
    timeout(Duration::from_secs(1), senders.output.send(equity(5)))
        .await
        .unwrap()
        .unwrap();

    // Everything arrives, in order, nothing lost.
    for expected in 2..=5 {
        let trade = timeout(Duration::from_secs(1), trades.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trade.size, expected);
    }

    relay.close().await;
}

// =============================================================================
// Error Surfaces
// =============================================================================

#[tokio::test]
async fn subscribe_surfaces_feed_error_verbatim() {
    let (feed, _senders) = ScriptedFeed::with_capacity(16);
    feed.reject_subscribe_with(FeedError::SubscriptionRejected("quota exceeded".to_string()));

    let mut relay = TickRelay::<EquityTrade>::with_connection(feed, 16);

    // No ping happened; the subscribe is still attempted and its error
    // surfaced unchanged.
    match relay.subscribe().await.unwrap_err() {
        RelayError::Subscribe(error) => assert_eq!(
            error,
            FeedError::SubscriptionRejected("quota exceeded".to_string())
        ),
        other => panic!("expected subscribe error, got {other:?}"),
    }
    assert!(relay.termination().is_none());
}

#[tokio::test]
async fn feed_error_signal_ends_stream_with_cause() {
    let (feed, senders) = ScriptedFeed::with_capacity(16);
    let mut relay = TickRelay::<EquityTrade>::with_connection(feed, 16);
    let mut trades = relay.subscribe().await.unwrap();

    senders
        .errors
        .send(FeedError::ConnectionClosed)
        .await
        .unwrap();

    assert!(
        timeout(Duration::from_secs(1), trades.recv())
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        relay.termination(),
        Some(RelayTermination::Feed(FeedError::ConnectionClosed))
    );

    relay.close().await;
}

#[tokio::test]
async fn upstream_stream_close_ends_relay() {
    let (feed, senders) = ScriptedFeed::with_capacity(16);
    let mut relay = TickRelay::<EquityTrade>::with_connection(feed, 16);
    let mut trades = relay.subscribe().await.unwrap();

    drop(senders);

    assert!(
        timeout(Duration::from_secs(1), trades.recv())
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(relay.termination(), Some(RelayTermination::StreamClosed));

    relay.close().await;
}
