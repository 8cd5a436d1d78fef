//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the real-time core to external systems:
//! - `memory` - Recording in-memory transport for tests and local tooling
//! - `pusher` - Pusher protocol WebSocket transport and channel authorizers

pub mod memory;
pub mod pusher;

pub use memory::{InMemoryTransport, TransportCall};
pub use pusher::{
    ConnectionState, HttpAuthorizerConfig, HttpChannelAuthorizer, PusherTransport,
    SigningChannelAuthorizer, TransportError,
};
