//! Upstream WebSocket Connection
//!
//! Implements the [`FeedConnection`] capability over the upstream push feed.
//! `connect` dials the WebSocket and spawns a read pump that decodes frames
//! onto the output stream; `subscribe` sends a registration request;
//! terminal conditions are signalled on the error stream or by the output
//! stream closing, whichever the pump reaches first.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FeedConnection, FeedError, FeedSenders, FeedStreams};
use crate::domain::trades::FeedChannel;
use crate::infrastructure::config::{SecretKey, Settings};

use super::codec::{UpstreamFrame, decode_frame};
use super::messages::{RegistrationRequest, channel_tr_id};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Capacity of the decoded-payload stream between the read pump and the
/// relay task.
const DEFAULT_FEED_BUFFER: usize = 256;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the upstream connection.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// WebSocket URL.
    pub url: String,
    /// Approval key placed in registration headers.
    pub approval_key: SecretKey,
    /// Topic key (`tr_key`) registered on subscribe.
    pub topic_key: String,
    /// Capacity of the decoded-payload stream.
    pub feed_buffer: usize,
}

impl UpstreamConfig {
    /// Derive a connection configuration from resolved settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.stream_url(),
            approval_key: settings.secret_key.clone(),
            topic_key: settings.market.as_str().to_string(),
            feed_buffer: DEFAULT_FEED_BUFFER,
        }
    }
}

// =============================================================================
// Connection
// =============================================================================

/// WebSocket-backed feed connection.
///
/// Created by [`UpstreamConnection::open`] without any network I/O; the
/// socket is dialed on `connect`.
pub struct UpstreamConnection {
    config: UpstreamConfig,
    senders: Mutex<Option<FeedSenders>>,
    streams: Mutex<Option<FeedStreams>>,
    writer: tokio::sync::Mutex<Option<WsWriter>>,
    cancel: CancellationToken,
}

impl UpstreamConnection {
    /// Open a connection handle. No network I/O happens here.
    #[must_use]
    pub fn open(config: UpstreamConfig) -> Self {
        let (senders, streams) = FeedStreams::channel(config.feed_buffer);
        Self {
            config,
            senders: Mutex::new(Some(senders)),
            streams: Mutex::new(Some(streams)),
            writer: tokio::sync::Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl FeedConnection for UpstreamConnection {
    async fn connect(&self) -> Result<(), FeedError> {
        if self.cancel.is_cancelled() {
            return Err(FeedError::ConnectionClosed);
        }

        let senders = self
            .senders
            .lock()
            .take()
            .ok_or_else(|| FeedError::ConnectionFailed("already connected".to_string()))?;

        match tokio_tungstenite::connect_async(&self.config.url).await {
            Ok((ws, _response)) => {
                let (writer, reader) = ws.split();
                *self.writer.lock().await = Some(writer);
                tokio::spawn(read_pump(reader, senders, self.cancel.clone()));
                tracing::info!(url = %self.config.url, "upstream connected");
                Ok(())
            }
            Err(error) => {
                // Hand the streams back so a later attempt can retry.
                *self.senders.lock() = Some(senders);
                Err(FeedError::ConnectionFailed(error.to_string()))
            }
        }
    }

    async fn subscribe(&self, channel: FeedChannel) -> Result<(), FeedError> {
        let request = RegistrationRequest::register(
            self.config.approval_key.expose(),
            channel_tr_id(channel),
            &self.config.topic_key,
        );
        let json = serde_json::to_string(&request).map_err(|error| {
            FeedError::SubscriptionRejected(format!("failed to serialize registration: {error}"))
        })?;

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(FeedError::NotConnected)?;
        writer
            .send(Message::Text(json.into()))
            .await
            .map_err(|error| FeedError::SubscriptionRejected(error.to_string()))?;

        tracing::debug!(
            channel = %channel,
            topic_key = %self.config.topic_key,
            "registration request sent"
        );
        Ok(())
    }

    fn take_streams(&self) -> Result<FeedStreams, FeedError> {
        self.streams.lock().take().ok_or(FeedError::StreamsTaken)
    }

    async fn close(&self) {
        self.cancel.cancel();
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.send(Message::Close(None)).await;
        }
        tracing::info!("upstream connection closed");
    }
}

/// Read frames until cancellation or a terminal condition.
///
/// Dropping the senders on exit closes both streams, so consumers always
/// observe a terminal signal even when no explicit error was sent.
async fn read_pump(mut reader: WsReader, senders: FeedSenders, cancel: CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                    Ok(UpstreamFrame::Payload(payload)) => {
                        // Blocks when the relay stops draining: backpressure
                        // propagates to the socket itself.
                        if senders.output.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Ok(UpstreamFrame::Handshake { confirmed: Some(topic) }) => {
                        tracing::info!(topic = %topic, "subscription confirmed");
                    }
                    Ok(UpstreamFrame::Handshake { confirmed: None }) => {
                        tracing::warn!("unconfirmed subscription acknowledgment");
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "skipping undecodable frame");
                    }
                },
                // tungstenite queues pong replies for inbound pings itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    let _ = senders.errors.send(FeedError::ConnectionClosed).await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    let _ = senders
                        .errors
                        .send(FeedError::ConnectionFailed(error.to_string()))
                        .await;
                    break;
                }
                None => break,
            }
        }
    }
    tracing::debug!("upstream read pump exited");
    // senders drop here; both streams close.
}
