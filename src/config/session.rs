//! Session configuration for the command-line client

use serde::Deserialize;

use crate::domain::foundation::{BoardId, UserId};

/// Who is listening and which board is open at start-up
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Authenticated user; without one the notification channel stays closed
    #[serde(default)]
    pub user_id: Option<UserId>,

    /// Board to subscribe to at start-up
    #[serde(default)]
    pub board_id: Option<BoardId>,
}
