//! In-memory transport for tests and local tooling.
//!
//! Records every call made through the transport port and lets the caller
//! simulate inbound messages with [`InMemoryTransport::deliver`]. Delivery is
//! synchronous and deterministic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::domain::realtime::{leave_targets, EventFormatter, PRIVATE_PREFIX};
use crate::ports::{ChannelHandle, Disconnect, GlobalListener, Listener, RealtimeTransport};

/// A call observed by the in-memory transport, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `channel(name)`
    Channel(String),
    /// `private(name)`, name without the `private-` prefix
    Private(String),
    /// `leave(name)`
    Leave(String),
    /// `listen` on `channel` for the formatted `event` name
    Listen { channel: String, event: String },
    /// `bind_global` on a channel
    BindGlobal(String),
    /// `unbind_global` on a channel
    UnbindGlobal(String),
    /// Disconnect capability invoked on a channel handle
    Disconnect(String),
}

#[derive(Default)]
struct ChannelEntry {
    listeners: HashMap<String, Vec<Listener>>,
    globals: Vec<GlobalListener>,
}

#[derive(Default)]
struct State {
    calls: Vec<TransportCall>,
    channels: HashMap<String, ChannelEntry>,
}

type SharedState = Arc<Mutex<State>>;

fn lock(state: &SharedState) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deterministic [`RealtimeTransport`] backed by a map of channels.
///
/// # Example
///
/// ```ignore
/// let transport = Arc::new(InMemoryTransport::new());
/// let channel = transport.channel("board.1");
/// channel.listen(".CardMoved", Arc::new(|data| println!("{data}")));
///
/// transport.deliver("board.1", "CardMoved", &json!({"post_id": 7}));
/// assert_eq!(transport.calls()[0], TransportCall::Channel("board.1".into()));
/// ```
pub struct InMemoryTransport {
    state: SharedState,
    formatter: EventFormatter,
    supports_disconnect: bool,
}

impl InMemoryTransport {
    /// Creates a transport whose handles expose the disconnect capability.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            formatter: EventFormatter::default(),
            supports_disconnect: true,
        }
    }

    /// Creates a transport whose handles have no disconnect capability.
    pub fn without_disconnect() -> Self {
        Self {
            supports_disconnect: false,
            ..Self::new()
        }
    }

    /// Uses `formatter` to turn listen labels into event names.
    pub fn with_formatter(mut self, formatter: EventFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    fn open(&self, full_name: String, call: TransportCall) -> Arc<dyn ChannelHandle> {
        {
            let mut state = lock(&self.state);
            state.calls.push(call);
            state.channels.entry(full_name.clone()).or_default();
        }
        Arc::new(InMemoryChannel {
            name: full_name,
            state: Arc::clone(&self.state),
            formatter: self.formatter.clone(),
            supports_disconnect: self.supports_disconnect,
        })
    }

    // === Test Helpers ===

    /// Simulates the transport receiving `event` on `channel`.
    ///
    /// Returns how many listeners (named and global) were invoked.
    pub fn deliver(&self, channel: &str, event: &str, payload: &Value) -> usize {
        // Clone listeners to release the lock before invoking them
        let (named, globals) = {
            let state = lock(&self.state);
            match state.channels.get(channel) {
                Some(entry) => (
                    entry.listeners.get(event).cloned().unwrap_or_default(),
                    entry.globals.clone(),
                ),
                None => (Vec::new(), Vec::new()),
            }
        };

        for listener in &named {
            listener(payload);
        }
        for listener in &globals {
            listener(event, payload);
        }
        named.len() + globals.len()
    }

    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.state).calls.clone()
    }

    /// Forgets recorded calls, keeping channels and listeners.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Whether `channel` (full name) is currently open.
    pub fn is_open(&self, channel: &str) -> bool {
        lock(&self.state).channels.contains_key(channel)
    }

    /// Full names of every open channel, sorted.
    pub fn open_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.state).channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of named plus global listeners on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        lock(&self.state)
            .channels
            .get(channel)
            .map(|entry| {
                entry.listeners.values().map(Vec::len).sum::<usize>() + entry.globals.len()
            })
            .unwrap_or(0)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeTransport for InMemoryTransport {
    fn channel(&self, name: &str) -> Arc<dyn ChannelHandle> {
        self.open(name.to_string(), TransportCall::Channel(name.to_string()))
    }

    fn private(&self, name: &str) -> Arc<dyn ChannelHandle> {
        self.open(
            format!("{}{}", PRIVATE_PREFIX, name),
            TransportCall::Private(name.to_string()),
        )
    }

    fn leave(&self, name: &str) {
        let mut state = lock(&self.state);
        state.calls.push(TransportCall::Leave(name.to_string()));
        for target in leave_targets(name) {
            state.channels.remove(&target);
        }
    }
}

struct InMemoryChannel {
    name: String,
    state: SharedState,
    formatter: EventFormatter,
    supports_disconnect: bool,
}

impl ChannelHandle for InMemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn listen(&self, event_label: &str, listener: Listener) {
        let event = self.formatter.format(event_label);
        let mut state = lock(&self.state);
        state.calls.push(TransportCall::Listen {
            channel: self.name.clone(),
            event: event.clone(),
        });
        state
            .channels
            .entry(self.name.clone())
            .or_default()
            .listeners
            .entry(event)
            .or_default()
            .push(listener);
    }

    fn bind_global(&self, listener: GlobalListener) {
        let mut state = lock(&self.state);
        state.calls.push(TransportCall::BindGlobal(self.name.clone()));
        state
            .channels
            .entry(self.name.clone())
            .or_default()
            .globals
            .push(listener);
    }

    fn unbind_global(&self) {
        let mut state = lock(&self.state);
        state.calls.push(TransportCall::UnbindGlobal(self.name.clone()));
        if let Some(entry) = state.channels.get_mut(&self.name) {
            entry.globals.clear();
        }
    }

    fn disconnector(&self) -> Option<&dyn Disconnect> {
        if self.supports_disconnect {
            Some(self as &dyn Disconnect)
        } else {
            None
        }
    }
}

impl Disconnect for InMemoryChannel {
    fn disconnect(&self) {
        let mut state = lock(&self.state);
        state.calls.push(TransportCall::Disconnect(self.name.clone()));
        state.channels.remove(&self.name);
    }
}
