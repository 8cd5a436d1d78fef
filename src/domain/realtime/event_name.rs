//! Closed set of event names the client knows how to handle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Named real-time events broadcast by the backend.
///
/// The string form of each variant is the exact event name carried on the
/// wire (after Echo's leading `.` marker has been removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    CardMoved,
    UserNotificationReceived,
    CommentNotificationReceived,
    LinkedIssueNotificationReceived,
    BranchNotificationReceived,
    TestBroadcast,
}

impl EventName {
    /// Every known event name.
    pub const ALL: [EventName; 6] = [
        EventName::CardMoved,
        EventName::UserNotificationReceived,
        EventName::CommentNotificationReceived,
        EventName::LinkedIssueNotificationReceived,
        EventName::BranchNotificationReceived,
        EventName::TestBroadcast,
    ];

    /// Returns the wire name of this event.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::CardMoved => "CardMoved",
            EventName::UserNotificationReceived => "UserNotificationReceived",
            EventName::CommentNotificationReceived => "CommentNotificationReceived",
            EventName::LinkedIssueNotificationReceived => "LinkedIssueNotificationReceived",
            EventName::BranchNotificationReceived => "BranchNotificationReceived",
            EventName::TestBroadcast => "TestBroadcast",
        }
    }

    /// Whether this event carries a `{ notification: {...} }` payload.
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            EventName::UserNotificationReceived
                | EventName::CommentNotificationReceived
                | EventName::LinkedIssueNotificationReceived
                | EventName::BranchNotificationReceived
        )
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::UnknownEvent, format!("Unknown event '{}'", s))
                    .with_detail("event", s)
            })
    }
}

/// Result of resolving an arbitrary transport string against [`EventName`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKey {
    Known(EventName),
    Unknown(String),
}

impl EventKey {
    /// Resolves a raw event name; never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<EventName>() {
            Ok(name) => EventKey::Known(name),
            Err(_) => EventKey::Unknown(raw.to_string()),
        }
    }

    /// Returns the known name, if any.
    pub fn known(&self) -> Option<EventName> {
        match self {
            EventKey::Known(name) => Some(*name),
            EventKey::Unknown(_) => None,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Known(name) => write!(f, "{}", name),
            EventKey::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}
