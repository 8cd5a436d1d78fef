//! Payload records carried by each known event.
//!
//! Field names match the backend's broadcast payloads exactly; these types
//! are transient transfer records and are never persisted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::foundation::{DomainError, ErrorCode};

use super::EventName;

/// Priority of a post on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Assignee ids arrive either as numbers or as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssigneeId {
    Number(i64),
    Text(String),
}

impl fmt::Display for AssigneeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssigneeId::Number(n) => write!(f, "{}", n),
            AssigneeId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Payload of [`EventName::CardMoved`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMovedPayload {
    pub post_id: i64,
    pub new_column_id: i64,
    pub title: String,
    pub desc: String,
    pub deadline: Option<String>,
    pub pinned: i64,
    pub priority: Priority,
    pub assignee_id: AssigneeId,
    pub assignee_name: String,
}

impl CardMovedPayload {
    /// The backend encodes the pinned flag as 0/1.
    pub fn is_pinned(&self) -> bool {
        self.pinned != 0
    }
}

/// A notification record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub fid_post: Option<i64>,
    #[serde(default)]
    pub fid_board: Option<i64>,
    #[serde(default)]
    pub fid_user: Option<i64>,
    #[serde(default)]
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen_at: Option<String>,
}

impl Notification {
    /// Whether the user has already seen this notification.
    pub fn is_seen(&self) -> bool {
        self.seen_at.is_some()
    }

    /// Parses `created_at`, accepting RFC 3339 and the backend's
    /// `YYYY-MM-DD HH:MM:SS` form (interpreted as UTC).
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_backend_timestamp(&self.created_at)
    }
}

fn parse_backend_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Payload shared by all notification events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub notification: Notification,
}

/// Payload of [`EventName::TestBroadcast`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestBroadcastPayload {
    pub message: String,
    #[serde(rename = "serverTimestamp")]
    pub server_timestamp: f64,
}

/// A decoded event: the name together with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    CardMoved(CardMovedPayload),
    UserNotificationReceived(NotificationPayload),
    CommentNotificationReceived(NotificationPayload),
    LinkedIssueNotificationReceived(NotificationPayload),
    BranchNotificationReceived(NotificationPayload),
    TestBroadcast(TestBroadcastPayload),
}

impl RealtimeEvent {
    /// Decodes `payload` according to the shape fixed by `name`.
    ///
    /// # Errors
    ///
    /// Returns `PayloadMismatch` when the payload does not have the expected shape.
    pub fn decode(name: EventName, payload: &Value) -> Result<Self, DomainError> {
        let event = match name {
            EventName::CardMoved => RealtimeEvent::CardMoved(payload_as(name, payload)?),
            EventName::UserNotificationReceived => {
                RealtimeEvent::UserNotificationReceived(payload_as(name, payload)?)
            }
            EventName::CommentNotificationReceived => {
                RealtimeEvent::CommentNotificationReceived(payload_as(name, payload)?)
            }
            EventName::LinkedIssueNotificationReceived => {
                RealtimeEvent::LinkedIssueNotificationReceived(payload_as(name, payload)?)
            }
            EventName::BranchNotificationReceived => {
                RealtimeEvent::BranchNotificationReceived(payload_as(name, payload)?)
            }
            EventName::TestBroadcast => RealtimeEvent::TestBroadcast(payload_as(name, payload)?),
        };
        Ok(event)
    }

    /// Returns the event name of this decoded event.
    pub fn name(&self) -> EventName {
        match self {
            RealtimeEvent::CardMoved(_) => EventName::CardMoved,
            RealtimeEvent::UserNotificationReceived(_) => EventName::UserNotificationReceived,
            RealtimeEvent::CommentNotificationReceived(_) => EventName::CommentNotificationReceived,
            RealtimeEvent::LinkedIssueNotificationReceived(_) => {
                EventName::LinkedIssueNotificationReceived
            }
            RealtimeEvent::BranchNotificationReceived(_) => EventName::BranchNotificationReceived,
            RealtimeEvent::TestBroadcast(_) => EventName::TestBroadcast,
        }
    }

    /// Returns the notification record for notification events.
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            RealtimeEvent::UserNotificationReceived(p)
            | RealtimeEvent::CommentNotificationReceived(p)
            | RealtimeEvent::LinkedIssueNotificationReceived(p)
            | RealtimeEvent::BranchNotificationReceived(p) => Some(&p.notification),
            RealtimeEvent::CardMoved(_) | RealtimeEvent::TestBroadcast(_) => None,
        }
    }
}

/// Deserializes a payload into the typed record `P`.
///
/// # Errors
///
/// Returns `PayloadMismatch` carrying the event name and the serde reason.
pub fn payload_as<P: DeserializeOwned>(name: EventName, payload: &Value) -> Result<P, DomainError> {
    P::deserialize(payload).map_err(|e| {
        DomainError::new(
            ErrorCode::PayloadMismatch,
            format!("Payload for {} has unexpected shape", name),
        )
        .with_detail("event", name.as_str())
        .with_detail("reason", e.to_string())
    })
}
