//! Registration Request Wire Types
//!
//! Outbound subscription registration messages for the upstream push feed.
//!
//! # Wire Format (JSON)
//! ```json
//! {
//!   "header": {
//!     "approval_key": "...",
//!     "custtype": "P",
//!     "tr_type": "1",
//!     "content-type": "utf-8"
//!   },
//!   "body": {
//!     "input": {"tr_id": "H0STCNT0", "tr_key": "005930"}
//!   }
//! }
//! ```
//!
//! `tr_type` is `"1"` to register a subscription and `"0"` to release it.
//! `custtype` is fixed to the personal-customer code.

use serde::{Deserialize, Serialize};

use crate::domain::trades::FeedChannel;

/// Personal-customer type code.
const CUSTTYPE_PERSONAL: &str = "P";

/// Register a subscription.
const TR_TYPE_REGISTER: &str = "1";

/// Release a subscription.
const TR_TYPE_RELEASE: &str = "0";

/// Fixed content type for registration frames.
const CONTENT_TYPE_UTF8: &str = "utf-8";

/// Wire transaction id for a feed channel.
#[must_use]
pub const fn channel_tr_id(channel: FeedChannel) -> &'static str {
    match channel {
        FeedChannel::EquityTrades => "H0STCNT0",
        FeedChannel::CryptoTrades => "H0CRCNT0",
    }
}

/// Subscription registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Request header.
    pub header: RegistrationHeader,
    /// Request body.
    pub body: RegistrationBody,
}

/// Registration request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationHeader {
    /// Subscription approval key.
    pub approval_key: String,

    /// Customer type (fixed to the personal code).
    pub custtype: String,

    /// `"1"` to register, `"0"` to release.
    pub tr_type: String,

    /// Fixed `"utf-8"`.
    #[serde(rename = "content-type")]
    pub content_type: String,
}

/// Registration request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationBody {
    /// Topic input.
    pub input: RegistrationInput,
}

/// Topic being registered or released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationInput {
    /// Transaction id (the channel).
    pub tr_id: String,

    /// Transaction key (the topic key within the channel).
    pub tr_key: String,
}

impl RegistrationRequest {
    fn new(approval_key: &str, tr_type: &str, tr_id: &str, tr_key: &str) -> Self {
        Self {
            header: RegistrationHeader {
                approval_key: approval_key.to_string(),
                custtype: CUSTTYPE_PERSONAL.to_string(),
                tr_type: tr_type.to_string(),
                content_type: CONTENT_TYPE_UTF8.to_string(),
            },
            body: RegistrationBody {
                input: RegistrationInput {
                    tr_id: tr_id.to_string(),
                    tr_key: tr_key.to_string(),
                },
            },
        }
    }

    /// Build a subscription registration for a topic.
    #[must_use]
    pub fn register(approval_key: &str, tr_id: &str, tr_key: &str) -> Self {
        Self::new(approval_key, TR_TYPE_REGISTER, tr_id, tr_key)
    }

    /// Build a subscription release for a topic.
    #[must_use]
    pub fn release(approval_key: &str, tr_id: &str, tr_key: &str) -> Self {
        Self::new(approval_key, TR_TYPE_RELEASE, tr_id, tr_key)
    }
}
