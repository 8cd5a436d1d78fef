//! Pusher protocol adapter.
//!
//! - `client` - `PusherTransport`, the WebSocket connection task and channel handles
//! - `protocol` - Frame codec and protocol constants
//! - `registry` - Registered channels and their listeners
//! - `auth` - HTTP and local-signing `ChannelAuthorizer` implementations

mod auth;
mod client;
pub mod protocol;
mod registry;

pub use auth::{HttpAuthorizerConfig, HttpChannelAuthorizer, SigningChannelAuthorizer};
pub use client::{ConnectionState, PusherChannel, PusherTransport, TransportError};
pub use protocol::{InboundFrame, ProtocolError, ReconnectPolicy};
