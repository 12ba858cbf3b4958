//! Frame Codec
//!
//! Classifies and decodes text frames from the upstream WebSocket: handshake
//! acknowledgments carry a `header` block, market data carries a `type` tag.

use crate::domain::trades::FeedPayload;

use super::handshake::confirmed_topic;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame matched no known shape.
    #[error("unrecognized frame: {0}")]
    UnrecognizedFrame(String),
}

/// A decoded upstream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFrame {
    /// Subscription handshake acknowledgment; `confirmed` holds the topic
    /// key when the acknowledgment validated.
    Handshake {
        /// Confirmed topic key, if the header block was fully populated.
        confirmed: Option<String>,
    },
    /// A market data payload.
    Payload(FeedPayload),
}

/// Decode one text frame.
///
/// # Errors
///
/// Returns a [`CodecError`] if the frame is not JSON or matches no known
/// shape. Callers on a push stream log and skip such frames.
pub fn decode_frame(text: &str) -> Result<UpstreamFrame, CodecError> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    if value.get("header").is_some() {
        return Ok(UpstreamFrame::Handshake {
            confirmed: confirmed_topic(text.as_bytes()),
        });
    }

    if value.get("type").is_some() {
        let payload: FeedPayload = serde_json::from_value(value)?;
        return Ok(UpstreamFrame::Payload(payload));
    }

    let preview: String = text.chars().take(50).collect();
    Err(CodecError::UnrecognizedFrame(preview))
}
