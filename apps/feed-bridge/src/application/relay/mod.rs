//! Typed Streaming Subscription Relay
//!
//! [`TickRelay`] owns one upstream [`FeedConnection`], one bounded consumer
//! channel, and one cancellation scope. `subscribe` starts a single relay
//! task that pulls payloads from the connection, narrows them to the
//! configured trade shape, and pushes them onto the consumer channel.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──ping──► Created ──subscribe──► Subscribed ──close──► Closed
//! ```
//!
//! `ping` may be skipped; `subscribe` is valid directly from `Created`.
//! `Closed` is terminal. A second `subscribe` while subscribed is rejected
//! with [`RelayError::AlreadySubscribed`] rather than starting a competing
//! relay task.
//!
//! # Shutdown Guarantee
//!
//! `close` cancels the relay task, closes the underlying connection, and
//! joins the task before returning. After `close` returns, no send to the
//! consumer channel is possible and the receiver yields end-of-stream.
//! Cancellation is only observed between messages: a send blocked on a full
//! consumer channel delays `close` until the consumer drains a slot.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FeedConnection, FeedError, FeedStreams};
use crate::domain::trades::TradeShape;
use crate::infrastructure::config::{ConfigError, ConfigMap, Settings};
use crate::infrastructure::upstream::{UpstreamConfig, UpstreamConnection};

// =============================================================================
// Error Type
// =============================================================================

/// Errors returned by relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A required configuration setting is missing or malformed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The underlying connect attempt failed before the deadline.
    #[error("connect failed: {0}")]
    Connect(#[source] FeedError),

    /// The underlying subscribe request failed; no relay task was started.
    #[error("subscribe failed: {0}")]
    Subscribe(#[source] FeedError),

    /// The caller-supplied deadline fired before the connect attempt settled.
    #[error("connect deadline exceeded")]
    DeadlineExceeded,

    /// A relay task is already active on this instance.
    #[error("already subscribed")]
    AlreadySubscribed,

    /// The relay was closed; no further operation is valid.
    #[error("relay closed")]
    Closed,
}

// =============================================================================
// Termination Cause
// =============================================================================

/// Why the relay task exited.
///
/// The consumer-facing contract signals shutdown only through end-of-stream
/// on the output channel; this cause is an optional diagnostic recorded for
/// [`TickRelay::termination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayTermination {
    /// Cancellation was signalled (a `close` call).
    Cancelled,
    /// The underlying connection reported a terminal error.
    Feed(FeedError),
    /// The underlying output stream closed.
    StreamClosed,
    /// The feed delivered a payload the relay was not built for.
    ShapeMismatch,
    /// The consumer dropped the receiver.
    ConsumerGone,
}

impl std::fmt::Display for RelayTermination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::Feed(error) => write!(f, "feed error: {error}"),
            Self::StreamClosed => f.write_str("upstream stream closed"),
            Self::ShapeMismatch => f.write_str("payload shape mismatch"),
            Self::ConsumerGone => f.write_str("consumer receiver dropped"),
        }
    }
}

// =============================================================================
// Relay
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Created,
    Subscribed,
    Closed,
}

/// Typed streaming subscription adapter.
///
/// Generic over one trade shape for its whole lifetime. Owns the underlying
/// connection exclusively; no other component may call its methods.
pub struct TickRelay<T: TradeShape> {
    conn: Arc<dyn FeedConnection>,
    channel: Option<(mpsc::Sender<T>, mpsc::Receiver<T>)>,
    cancel: CancellationToken,
    relay: Option<JoinHandle<()>>,
    termination: Arc<Mutex<Option<RelayTermination>>>,
    state: RelayState,
}

impl<T: TradeShape> TickRelay<T> {
    /// Build a relay from resolved configuration.
    ///
    /// Resolves `SECRET_KEY`, `FEED`, `MARKET`, and `BUFFER_SIZE`, opens the
    /// upstream connection handle (no network I/O yet), and creates the
    /// empty, capacity-bounded consumer channel.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if any required setting is missing or
    /// malformed.
    pub fn from_config(config: &ConfigMap) -> Result<Self, RelayError> {
        let settings = Settings::resolve(config)?;
        let conn = UpstreamConnection::open(UpstreamConfig::from_settings(&settings));
        Ok(Self::with_connection(Arc::new(conn), settings.buffer_size))
    }

    /// Build a relay over an already-constructed connection.
    #[must_use]
    pub fn with_connection(conn: Arc<dyn FeedConnection>, capacity: usize) -> Self {
        Self {
            conn,
            channel: Some(mpsc::channel(capacity)),
            cancel: CancellationToken::new(),
            relay: None,
            termination: Arc::new(Mutex::new(None)),
            state: RelayState::Created,
        }
    }

    /// Verify connectivity by racing a connect attempt against `deadline`.
    ///
    /// The attempt runs on a child task of this relay's cancellation scope:
    /// if the deadline fires first the child is cancelled rather than leaked,
    /// and a later `close` tears down any attempt still in flight. Does not
    /// start relaying.
    ///
    /// # Errors
    ///
    /// [`RelayError::DeadlineExceeded`] if the deadline fires first,
    /// [`RelayError::Connect`] if the connect attempt fails first, or
    /// [`RelayError::Closed`] if the relay was closed meanwhile.
    pub async fn ping(&self, deadline: Duration) -> Result<(), RelayError> {
        if self.state == RelayState::Closed {
            return Err(RelayError::Closed);
        }

        let attempt = self.cancel.child_token();
        let watch = attempt.clone();
        let conn = Arc::clone(&self.conn);

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = watch.cancelled() => None,
                result = conn.connect() => Some(result),
            }
        });

        match tokio::time::timeout(deadline, handle).await {
            Ok(Ok(Some(result))) => result.map_err(RelayError::Connect),
            Ok(Ok(None)) => Err(RelayError::Closed),
            Ok(Err(join)) => Err(RelayError::Connect(FeedError::ConnectionFailed(format!(
                "connect task failed: {join}"
            )))),
            Err(_) => {
                attempt.cancel();
                Err(RelayError::DeadlineExceeded)
            }
        }
    }

    /// Subscribe to the shape's channel and start the single relay task.
    ///
    /// The connection should normally be reachable (a prior `ping`
    /// succeeded), but ordering is not enforced: the underlying subscribe is
    /// attempted regardless and its error surfaced verbatim, in which case no
    /// relay task is started and the relay stays subscribable.
    ///
    /// # Errors
    ///
    /// [`RelayError::AlreadySubscribed`] while a relay task is active,
    /// [`RelayError::Closed`] after `close`, or [`RelayError::Subscribe`]
    /// with the underlying error.
    pub async fn subscribe(&mut self) -> Result<mpsc::Receiver<T>, RelayError> {
        match self.state {
            RelayState::Subscribed => return Err(RelayError::AlreadySubscribed),
            RelayState::Closed => return Err(RelayError::Closed),
            RelayState::Created => {}
        }

        self.conn
            .subscribe(T::channel())
            .await
            .map_err(RelayError::Subscribe)?;

        let streams = self.conn.take_streams().map_err(RelayError::Subscribe)?;
        let (tx, rx) = self
            .channel
            .take()
            .ok_or(RelayError::AlreadySubscribed)?;

        let cancel = self.cancel.clone();
        let termination = Arc::clone(&self.termination);
        self.relay = Some(tokio::spawn(relay_loop::<T>(
            streams,
            tx,
            cancel,
            termination,
        )));
        self.state = RelayState::Subscribed;

        tracing::debug!(channel = %T::channel(), "relay task started");
        Ok(rx)
    }

    /// Tear down deterministically.
    ///
    /// Signals cancellation, closes the underlying connection, and blocks
    /// until the relay task (if any) has exited. After this returns, the
    /// consumer receiver yields end-of-stream and no further value is ever
    /// delivered, even if the underlying connection still had buffered
    /// output.
    pub async fn close(&mut self) {
        self.state = RelayState::Closed;
        self.cancel.cancel();
        self.conn.close().await;

        if let Some(relay) = self.relay.take()
            && relay.await.is_err()
        {
            tracing::warn!("relay task panicked before joining");
        }

        // Never subscribed: drop the untouched channel pair.
        self.channel = None;
    }

    /// Why the relay task exited, if it has.
    ///
    /// `None` while the task is still running (or was never started). The
    /// output channel closing remains the only signal the consumer is
    /// required to handle; this accessor is diagnostic.
    #[must_use]
    pub fn termination(&self) -> Option<RelayTermination> {
        self.termination.lock().clone()
    }
}

/// The single relay task: select among cancellation, a terminal error
/// signal, and the next payload. First ready wins; there is no priority
/// between the three arms.
async fn relay_loop<T: TradeShape>(
    mut streams: FeedStreams,
    output: mpsc::Sender<T>,
    cancel: CancellationToken,
    termination: Arc<Mutex<Option<RelayTermination>>>,
) {
    let cause = loop {
        tokio::select! {
            () = cancel.cancelled() => break RelayTermination::Cancelled,
            error = streams.errors.recv() => {
                break error.map_or(RelayTermination::StreamClosed, RelayTermination::Feed);
            }
            payload = streams.output.recv() => {
                let Some(payload) = payload else {
                    break RelayTermination::StreamClosed;
                };
                let Some(message) = T::narrow(payload) else {
                    break RelayTermination::ShapeMismatch;
                };
                // Blocks while the consumer channel is full: backpressure
                // reaches the upstream connection because its output is no
                // longer drained. Cancellation is observed only at the
                // select above, never mid-send.
                if output.send(message).await.is_err() {
                    break RelayTermination::ConsumerGone;
                }
            }
        }
    };

    tracing::debug!(cause = %cause, "relay task exited");
    *termination.lock() = Some(cause);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{FeedSenders, MockFeedConnection};
    use crate::domain::trades::{EquityTrade, FeedChannel};
    use async_trait::async_trait;
    use tokio_test::assert_ok;

    struct HangingFeed;

    #[async_trait]
    impl FeedConnection for HangingFeed {
        async fn connect(&self) -> Result<(), FeedError> {
            std::future::pending().await
        }

        async fn subscribe(&self, _channel: FeedChannel) -> Result<(), FeedError> {
            Ok(())
        }

        fn take_streams(&self) -> Result<FeedStreams, FeedError> {
            Err(FeedError::StreamsTaken)
        }

        async fn close(&self) {}
    }

    struct StubFeed {
        streams: Mutex<Option<FeedStreams>>,
    }

    impl StubFeed {
        fn with_streams() -> (Self, FeedSenders) {
            let (senders, streams) = FeedStreams::channel(8);
            (
                Self {
                    streams: Mutex::new(Some(streams)),
                },
                senders,
            )
        }
    }

    #[async_trait]
    impl FeedConnection for StubFeed {
        async fn connect(&self) -> Result<(), FeedError> {
            Ok(())
        }

        async fn subscribe(&self, _channel: FeedChannel) -> Result<(), FeedError> {
            Ok(())
        }

        fn take_streams(&self) -> Result<FeedStreams, FeedError> {
            self.streams.lock().take().ok_or(FeedError::StreamsTaken)
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn ping_succeeds_when_connect_succeeds() {
        let mut mock = MockFeedConnection::new();
        mock.expect_connect().once().returning(|| Ok(()));

        let relay = TickRelay::<EquityTrade>::with_connection(Arc::new(mock), 8);
        assert_ok!(relay.ping(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn ping_surfaces_connect_error() {
        let mut mock = MockFeedConnection::new();
        mock.expect_connect()
            .once()
            .returning(|| Err(FeedError::ConnectionFailed("refused".to_string())));

        let relay = TickRelay::<EquityTrade>::with_connection(Arc::new(mock), 8);
        let err = relay.ping(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::Connect(FeedError::ConnectionFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ping_deadline_cancels_hanging_connect() {
        let relay = TickRelay::<EquityTrade>::with_connection(Arc::new(HangingFeed), 8);
        let err = relay.ping(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, RelayError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn subscribe_surfaces_underlying_error_and_starts_nothing() {
        let mut mock = MockFeedConnection::new();
        mock.expect_subscribe()
            .once()
            .returning(|_| Err(FeedError::NotConnected));

        let mut relay = TickRelay::<EquityTrade>::with_connection(Arc::new(mock), 8);
        let err = relay.subscribe().await.unwrap_err();
        assert!(matches!(err, RelayError::Subscribe(FeedError::NotConnected)));
        assert!(relay.termination().is_none());
    }

    #[tokio::test]
    async fn second_subscribe_is_rejected() {
        let (feed, _senders) = StubFeed::with_streams();
        let mut relay = TickRelay::<EquityTrade>::with_connection(Arc::new(feed), 8);

        let _rx = relay.subscribe().await.unwrap();
        let err = relay.subscribe().await.unwrap_err();
        assert!(matches!(err, RelayError::AlreadySubscribed));

        relay.close().await;
    }

    #[tokio::test]
    async fn closed_relay_rejects_operations() {
        let mut mock = MockFeedConnection::new();
        mock.expect_close().once().returning(|| ());

        let mut relay = TickRelay::<EquityTrade>::with_connection(Arc::new(mock), 8);
        relay.close().await;

        assert!(matches!(
            relay.ping(Duration::from_secs(1)).await.unwrap_err(),
            RelayError::Closed
        ));
        assert!(matches!(
            relay.subscribe().await.unwrap_err(),
            RelayError::Closed
        ));
    }

    #[tokio::test]
    async fn close_records_cancellation_cause() {
        let (feed, _senders) = StubFeed::with_streams();
        let mut relay = TickRelay::<EquityTrade>::with_connection(Arc::new(feed), 8);

        let _rx = relay.subscribe().await.unwrap();
        relay.close().await;

        assert_eq!(relay.termination(), Some(RelayTermination::Cancelled));
    }
}
