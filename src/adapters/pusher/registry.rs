//! Channels the client wants to be subscribed to, and their listeners.
//!
//! The registry survives reconnects: after every `connection_established`
//! the connection task resubscribes whatever is registered here.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::ports::{GlobalListener, Listener};

#[derive(Default)]
struct Entry {
    listeners: HashMap<String, Vec<Listener>>,
    globals: Vec<GlobalListener>,
    subscribed: bool,
}

#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, Entry>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `channel`; returns true when it was not registered yet.
    pub fn ensure(&self, channel: &str) -> bool {
        let mut channels = self.lock();
        if channels.contains_key(channel) {
            return false;
        }
        channels.insert(channel.to_string(), Entry::default());
        true
    }

    /// Forgets `channel` and its listeners; returns whether it was registered.
    pub fn remove(&self, channel: &str) -> bool {
        self.lock().remove(channel).is_some()
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.lock().contains_key(channel)
    }

    /// Registered channel names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn listen(&self, channel: &str, event: String, listener: Listener) {
        if let Some(entry) = self.lock().get_mut(channel) {
            entry.listeners.entry(event).or_default().push(listener);
        }
    }

    pub fn bind_global(&self, channel: &str, listener: GlobalListener) {
        if let Some(entry) = self.lock().get_mut(channel) {
            entry.globals.push(listener);
        }
    }

    pub fn unbind_global(&self, channel: &str) {
        if let Some(entry) = self.lock().get_mut(channel) {
            entry.globals.clear();
        }
    }

    pub fn set_subscribed(&self, channel: &str, subscribed: bool) {
        if let Some(entry) = self.lock().get_mut(channel) {
            entry.subscribed = subscribed;
        }
    }

    /// Marks every channel unsubscribed, as after a dropped connection.
    pub fn reset_subscriptions(&self) {
        for entry in self.lock().values_mut() {
            entry.subscribed = false;
        }
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.lock().get(channel).is_some_and(|e| e.subscribed)
    }

    /// Delivers an event to the channel's listeners for `event`, then to its
    /// global listeners. Returns how many callbacks ran.
    ///
    /// Callbacks run after the lock is released, so they may use the registry.
    pub fn route(&self, channel: &str, event: &str, data: &Value) -> usize {
        let (listeners, globals) = {
            let channels = self.lock();
            let Some(entry) = channels.get(channel) else {
                return 0;
            };
            (
                entry.listeners.get(event).cloned().unwrap_or_default(),
                entry.globals.clone(),
            )
        };

        for listener in &listeners {
            listener(data);
        }
        for global in &globals {
            global(event, data);
        }
        listeners.len() + globals.len()
    }
}
