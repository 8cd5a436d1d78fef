//! Channel and event label configuration

use serde::Deserialize;

use crate::domain::realtime::{ChannelNaming, EventFormatter};

use super::error::ValidationError;

/// Names of the channels and events the backend broadcasts on
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Board channels are `<board_prefix>.<board id>`
    #[serde(default = "default_board_prefix")]
    pub board_prefix: String,

    /// Private user channels are `private-<user_channel_prefix>.<user id>`
    #[serde(default = "default_user_channel_prefix")]
    pub user_channel_prefix: String,

    /// Namespace prepended to event labels that are not literal
    #[serde(default = "default_event_namespace")]
    pub event_namespace: String,

    /// Label the card-moved event is broadcast under
    #[serde(default = "default_card_moved_label")]
    pub card_moved_label: String,
}

impl ChannelConfig {
    pub fn naming(&self) -> ChannelNaming {
        ChannelNaming::new(&self.board_prefix, &self.user_channel_prefix)
    }

    pub fn formatter(&self) -> EventFormatter {
        EventFormatter::new(&self.event_namespace)
    }

    /// Validate channel configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_prefix(&self.board_prefix) {
            return Err(ValidationError::InvalidChannelPrefix("board_prefix"));
        }
        if !is_valid_prefix(&self.user_channel_prefix) {
            return Err(ValidationError::InvalidChannelPrefix("user_channel_prefix"));
        }
        if self.card_moved_label.trim().is_empty() {
            return Err(ValidationError::InvalidEventLabel);
        }
        Ok(())
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            board_prefix: default_board_prefix(),
            user_channel_prefix: default_user_channel_prefix(),
            event_namespace: default_event_namespace(),
            card_moved_label: default_card_moved_label(),
        }
    }
}

fn default_board_prefix() -> String {
    "board".to_string()
}

fn default_user_channel_prefix() -> String {
    "App.Models.User".to_string()
}

fn default_event_namespace() -> String {
    "App.Events".to_string()
}

fn default_card_moved_label() -> String {
    ".CardMoved".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{BoardId, UserId};

    #[test]
    fn test_channel_config_defaults() {
        let config = ChannelConfig::default();
        let naming = config.naming();
        assert_eq!(naming.board(&BoardId::new("42").unwrap()), "board.42");
        assert_eq!(naming.user(&UserId::new("5").unwrap()), "App.Models.User.5");
        assert_eq!(config.card_moved_label, ".CardMoved");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_formatter_uses_namespace() {
        let config = ChannelConfig {
            event_namespace: "Kanban.Events".to_string(),
            ..Default::default()
        };
        assert_eq!(config.formatter().format("CardMoved"), "Kanban\\Events\\CardMoved");
        assert_eq!(config.formatter().format(".CardMoved"), "CardMoved");
    }

    #[test]
    fn test_validation_rejects_empty_prefix() {
        let config = ChannelConfig {
            board_prefix: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidChannelPrefix("board_prefix"))
        ));
    }

    #[test]
    fn test_validation_rejects_prefix_with_spaces() {
        let config = ChannelConfig {
            user_channel_prefix: "App Models".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_blank_label() {
        let config = ChannelConfig {
            card_moved_label: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidEventLabel)
        ));
    }
}
