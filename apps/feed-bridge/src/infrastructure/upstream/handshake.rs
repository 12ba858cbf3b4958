//! Subscription Handshake Validation
//!
//! Parses the acknowledgment the upstream feed pushes after a registration
//! request and decides whether the confirmed topic key is present and
//! well-formed.
//!
//! # Wire Format (JSON)
//! ```json
//! {
//!   "header": {"tr_id": "H0STCNT0", "tr_key": "005930", "encrypt": "N"},
//!   "body": {
//!     "rt_cd": "0",
//!     "msg_cd": "OPSP0000",
//!     "msg1": "SUBSCRIBE SUCCESS",
//!     "output": {"iv": "...", "key": "..."}
//!   }
//! }
//! ```
//!
//! An acknowledgment is confirmed iff all three header fields are non-empty.
//! The body is advisory. `output.iv`/`output.key` are encryption material for
//! encrypted channels; decrypting payloads is out of scope here, so the
//! material is carried but never interpreted.

use serde::{Deserialize, Serialize};

/// Subscription handshake acknowledgment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeAck {
    /// Acknowledgment header (identifies the confirmed topic).
    #[serde(default)]
    pub header: AckHeader,

    /// Advisory result body.
    #[serde(default)]
    pub body: Option<AckBody>,
}

/// Acknowledgment header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckHeader {
    /// Transaction id (the channel).
    #[serde(default)]
    pub tr_id: String,

    /// Transaction key (the confirmed topic key).
    #[serde(default)]
    pub tr_key: String,

    /// Encryption flag ("Y"/"N").
    #[serde(default)]
    pub encrypt: String,
}

/// Acknowledgment body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckBody {
    /// Result code.
    #[serde(default)]
    pub rt_cd: String,

    /// Message code.
    #[serde(default)]
    pub msg_cd: String,

    /// Message text.
    #[serde(default)]
    pub msg1: String,

    /// Encryption material for encrypted channels.
    #[serde(default)]
    pub output: Option<CipherMaterial>,
}

/// Encryption material accompanying an encrypted-channel acknowledgment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherMaterial {
    /// Initialization vector.
    #[serde(default)]
    pub iv: String,

    /// Symmetric key.
    #[serde(default)]
    pub key: String,
}

/// Extract the confirmed topic key from a raw acknowledgment.
///
/// Fails soft: returns `None` on any decode error or when a header field is
/// empty. Malformed frames are expected on a push stream and must never halt
/// the caller's loop.
#[must_use]
pub fn confirmed_topic(data: &[u8]) -> Option<String> {
    let ack: HandshakeAck = serde_json::from_slice(data).ok()?;
    let header = ack.header;
    if header.tr_id.is_empty() || header.tr_key.is_empty() || header.encrypt.is_empty() {
        return None;
    }
    Some(header.tr_key)
}
