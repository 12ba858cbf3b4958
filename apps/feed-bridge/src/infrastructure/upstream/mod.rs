//! Upstream Feed Adapter
//!
//! Implements the feed-connection capability over the upstream push feed's
//! WebSocket protocol:
//!
//! - **connection**: WebSocket client implementing `FeedConnection`
//! - **codec**: Frame decoding (handshake acks vs. market data)
//! - **messages**: Registration request wire types
//! - **handshake**: Subscription acknowledgment validation
//! - **approval**: One-shot approval-key exchange wire types

pub mod approval;
pub mod codec;
pub mod connection;
pub mod handshake;
pub mod messages;

pub use approval::{ApprovalKeyRequest, ApprovalKeyResponse};
pub use codec::{CodecError, UpstreamFrame, decode_frame};
pub use connection::{UpstreamConfig, UpstreamConnection};
pub use handshake::{AckBody, AckHeader, CipherMaterial, HandshakeAck, confirmed_topic};
pub use messages::{RegistrationHeader, RegistrationInput, RegistrationRequest, channel_tr_id};
