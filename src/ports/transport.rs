//! RealtimeTransport port - Interface to the publish/subscribe client.
//!
//! The router and the board subscription manager are built on these
//! primitives only, so any WebSocket client exposing named channels,
//! per-event listeners and a catch-all bind can back them.

use serde_json::Value;
use std::sync::Arc;

/// Callback bound to a single named event on a channel.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Callback receiving every event on a channel, with its raw name.
pub type GlobalListener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Optional capability: tear down the connection behind a channel handle.
pub trait Disconnect: Send + Sync {
    fn disconnect(&self);
}

/// A subscribed channel.
///
/// # Example
///
/// ```ignore
/// let channel = transport.channel("board.42");
/// channel.listen(".CardMoved", Arc::new(|data| println!("{data}")));
/// ```
pub trait ChannelHandle: Send + Sync {
    /// Full channel name as passed to `channel()` / `private()`.
    fn name(&self) -> &str;

    /// Binds `listener` to the event identified by `event_label`.
    ///
    /// Labels follow Echo's convention: a leading `.` means the name is
    /// literal, anything else is qualified with the event namespace.
    fn listen(&self, event_label: &str, listener: Listener);

    /// Binds a listener receiving every event delivered on this channel.
    fn bind_global(&self, listener: GlobalListener);

    /// Removes every listener added through [`ChannelHandle::bind_global`].
    fn unbind_global(&self);

    /// Returns the disconnect capability when the handle supports it.
    fn disconnector(&self) -> Option<&dyn Disconnect> {
        None
    }
}

/// Port for opening and leaving named channels.
pub trait RealtimeTransport: Send + Sync {
    /// Opens (or returns) a public channel.
    fn channel(&self, name: &str) -> Arc<dyn ChannelHandle>;

    /// Opens (or returns) a private channel; the transport adds the `private-` prefix.
    fn private(&self, name: &str) -> Arc<dyn ChannelHandle>;

    /// Unsubscribes `name` and its private/presence variants.
    fn leave(&self, name: &str);
}
