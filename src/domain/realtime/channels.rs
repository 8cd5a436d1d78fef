//! Channel naming and board subscription state.

use crate::domain::foundation::{BoardId, UserId};

/// Prefix the transport adds to private channel names.
pub const PRIVATE_PREFIX: &str = "private-";

/// Prefix the transport adds to presence channel names.
pub const PRESENCE_PREFIX: &str = "presence-";

/// Builds the channel names used for boards and user notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNaming {
    board_prefix: String,
    user_prefix: String,
}

impl ChannelNaming {
    pub fn new(board_prefix: impl Into<String>, user_prefix: impl Into<String>) -> Self {
        Self {
            board_prefix: board_prefix.into(),
            user_prefix: user_prefix.into(),
        }
    }

    /// `board.<id>` with the default prefix.
    pub fn board(&self, board_id: &BoardId) -> String {
        format!("{}.{}", self.board_prefix, board_id)
    }

    /// Name passed to `private()`; the transport adds `private-` itself.
    pub fn user(&self, user_id: &UserId) -> String {
        format!("{}.{}", self.user_prefix, user_id)
    }
}

impl Default for ChannelNaming {
    fn default() -> Self {
        Self::new("board", "App.Models.User")
    }
}

/// Whether a full channel name requires authorization before subscribing.
pub fn requires_auth(channel: &str) -> bool {
    channel.starts_with(PRIVATE_PREFIX) || channel.starts_with(PRESENCE_PREFIX)
}

/// All transport channel names an Echo-style `leave(name)` unsubscribes.
pub fn leave_targets(name: &str) -> [String; 3] {
    [
        name.to_string(),
        format!("{}{}", PRIVATE_PREFIX, name),
        format!("{}{}", PRESENCE_PREFIX, name),
    ]
}

/// Observable state of the board subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    #[default]
    Unsubscribed,
    Subscribed(BoardId),
}

impl SubscriptionState {
    pub fn board(&self) -> Option<&BoardId> {
        match self {
            SubscriptionState::Unsubscribed => None,
            SubscriptionState::Subscribed(board_id) => Some(board_id),
        }
    }
}
