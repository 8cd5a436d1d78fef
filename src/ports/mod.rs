//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the real-time core and the outside world. Adapters implement these ports.
//!
//! - `RealtimeTransport` / `ChannelHandle` - Publish/subscribe client primitives
//! - `Disconnect` - Optional teardown capability of a channel handle
//! - `ChannelAuthorizer` - Signing of private channel subscriptions

mod channel_authorizer;
mod transport;

pub use channel_authorizer::{AuthorizationError, ChannelAuth, ChannelAuthorizer};
pub use transport::{ChannelHandle, Disconnect, GlobalListener, Listener, RealtimeTransport};
