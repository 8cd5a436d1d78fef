//! Real-time vocabulary: event names, payloads, channels and labels.
//!
//! - `event_name` - Closed enumeration of known events and lenient parsing
//! - `payloads` - Typed payload records and the decoded `RealtimeEvent`
//! - `channels` - Channel naming and the board subscription state
//! - `labels` - Echo-style event label formatting, reserved prefixes
//! - `diagnostics` - Development/production reporting policy

mod channels;
mod diagnostics;
mod event_name;
mod labels;
mod payloads;

pub use channels::{
    leave_targets, requires_auth, ChannelNaming, SubscriptionState, PRESENCE_PREFIX,
    PRIVATE_PREFIX,
};
pub use diagnostics::DiagnosticsMode;
pub use event_name::{EventKey, EventName};
pub use labels::{is_reserved, strip_marker, EventFormatter, EVENT_MARKER, RESERVED_PREFIXES};
pub use payloads::{
    payload_as, AssigneeId, CardMovedPayload, Notification, NotificationPayload, Priority,
    RealtimeEvent, TestBroadcastPayload,
};
