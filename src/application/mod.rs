//! Application layer - the real-time core built on the ports.
//!
//! - `router` - One-handler-per-event dispatch table
//! - `board_subscription` - Single active board channel
//! - `notification_wiring` - Private user channel forwarding into the router
//! - `context` - Explicit owner of all of the above for one client session

mod board_subscription;
mod context;
mod notification_wiring;
mod router;

pub use board_subscription::{BoardSubscriptionManager, SubscribeOutcome};
pub use context::RealtimeContext;
pub use notification_wiring::{route_transport_event, UserNotificationWiring};
pub use router::{DispatchOutcome, EventRouter, Handler};
