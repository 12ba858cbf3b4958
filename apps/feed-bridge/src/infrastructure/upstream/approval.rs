//! Approval-Key Exchange Wire Types
//!
//! One-shot exchange that trades API credentials for the approval key used in
//! registration headers. The transport is owned by the caller; these types
//! only pin the wire schema.
//!
//! # Wire Format (JSON)
//! ```json
//! {"grant_type": "client_credentials", "appkey": "...", "secretkey": "..."}
//! ```
//! ```json
//! {"approval_key": "..."}
//! ```

use serde::{Deserialize, Serialize};

/// Grant type for the credentials exchange.
const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Approval-key exchange request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalKeyRequest {
    /// OAuth-style grant type.
    pub grant_type: String,

    /// Application key.
    pub appkey: String,

    /// Application secret.
    pub secretkey: String,
}

impl ApprovalKeyRequest {
    /// Build a client-credentials exchange request.
    #[must_use]
    pub fn client_credentials(appkey: impl Into<String>, secretkey: impl Into<String>) -> Self {
        Self {
            grant_type: GRANT_TYPE_CLIENT_CREDENTIALS.to_string(),
            appkey: appkey.into(),
            secretkey: secretkey.into(),
        }
    }
}

/// Approval-key exchange response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalKeyResponse {
    /// Key to place in registration headers.
    pub approval_key: String,
}
