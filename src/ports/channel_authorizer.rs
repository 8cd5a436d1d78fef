//! ChannelAuthorizer port - Signs private channel subscriptions.
//!
//! Private and presence channels require an `auth` token bound to the
//! socket id the server assigned to the connection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors that can occur while authorizing a channel subscription.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    /// The auth endpoint refused the request
    #[error("Authorization rejected for {channel}: HTTP {status}")]
    Rejected { channel: String, status: u16 },

    /// The auth endpoint could not be reached
    #[error("Authorization request failed: {0}")]
    Request(String),

    /// The auth endpoint answered with an unexpected body
    #[error("Malformed authorization response: {0}")]
    MalformedResponse(String),

    /// A locally computed or received signature is invalid
    #[error("Invalid channel signature")]
    InvalidSignature,
}

/// Credentials attached to a `pusher:subscribe` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAuth {
    /// `<app key>:<hex signature>`
    pub auth: String,

    /// Presence channels also carry JSON-encoded member data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}

/// Port for authorizing private channel subscriptions.
#[async_trait]
pub trait ChannelAuthorizer: Send + Sync {
    /// Authorizes `channel` for the connection identified by `socket_id`.
    async fn authorize(&self, socket_id: &str, channel: &str)
        -> Result<ChannelAuth, AuthorizationError>;
}
