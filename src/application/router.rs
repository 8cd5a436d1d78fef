//! Event router - one handler per event name.
//!
//! Decouples message arrival on the transport from the UI reaction to it.
//! Producers (the board channel listener, the private user channel) call
//! [`EventRouter::dispatch`]; consumers register with [`EventRouter::define`].
//!
//! # Example
//!
//! ```ignore
//! let router = EventRouter::new(DiagnosticsMode::from_build());
//! router.define(EventName::CardMoved, |payload| board.apply_move(payload));
//!
//! router.dispatch("CardMoved", &payload);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::realtime::{payload_as, DiagnosticsMode, EventKey, EventName};

/// A registered handler.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// What a dispatch call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The registered handler was invoked once.
    Handled,
    /// No handler is registered (or the name is unknown); nothing happened.
    Unhandled,
}

/// Dispatch table keyed by [`EventName`].
///
/// Handlers are invoked synchronously on the caller's thread, after the
/// table lock has been released, so a handler may itself call `define`,
/// `dispatch` or `reset`.
pub struct EventRouter {
    handlers: RwLock<HashMap<EventName, Handler>>,
    mode: DiagnosticsMode,
}

impl EventRouter {
    /// Creates an empty router reporting according to `mode`.
    pub fn new(mode: DiagnosticsMode) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            mode,
        }
    }

    /// Creates as an Arc (for sharing with transport listeners).
    pub fn new_shared(mode: DiagnosticsMode) -> Arc<Self> {
        Arc::new(Self::new(mode))
    }

    pub fn mode(&self) -> DiagnosticsMode {
        self.mode
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EventName, Handler>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EventName, Handler>> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handler` for `name`, replacing any earlier handler.
    ///
    /// Replacing is not an error, but it is reported with a warning since it
    /// usually means two components claim the same event.
    pub fn define<F>(&self, name: EventName, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let previous = self.write().insert(name, Arc::new(handler));
        if previous.is_some() {
            tracing::warn!(event = %name, "Handler for event overwritten");
        } else {
            tracing::debug!(event = %name, "Handler registered");
        }
    }

    /// Registers a handler receiving the payload decoded as `P`.
    ///
    /// Payloads that do not decode are logged and skipped.
    pub fn define_typed<P, F>(&self, name: EventName, handler: F)
    where
        P: DeserializeOwned + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        self.define(name, move |payload| match payload_as::<P>(name, payload) {
            Ok(decoded) => handler(decoded),
            Err(e) => {
                tracing::warn!(
                    event = %name,
                    error = %e,
                    "Dropping event with unexpected payload shape"
                );
            }
        });
    }

    /// Invokes the handler registered for `event`, passing `payload` unchanged.
    ///
    /// Unknown or unregistered names never fail: development mode logs a
    /// warning with the payload, production mode does nothing.
    pub fn dispatch(&self, event: &str, payload: &Value) -> DispatchOutcome {
        match EventKey::parse(event) {
            EventKey::Known(name) => self.dispatch_event(name, payload),
            key @ EventKey::Unknown(_) => {
                self.report_unhandled(&key, payload);
                DispatchOutcome::Unhandled
            }
        }
    }

    /// Typed form of [`EventRouter::dispatch`].
    pub fn dispatch_event(&self, name: EventName, payload: &Value) -> DispatchOutcome {
        // Clone the handler to release the lock before invoking it
        let handler = self.read().get(&name).cloned();

        match handler {
            Some(handler) => {
                tracing::trace!(event = %name, "Dispatching event");
                handler(payload);
                DispatchOutcome::Handled
            }
            None => {
                self.report_unhandled(&EventKey::Known(name), payload);
                DispatchOutcome::Unhandled
            }
        }
    }

    fn report_unhandled(&self, key: &EventKey, payload: &Value) {
        if self.mode.is_development() {
            tracing::warn!(event = %key, payload = %payload, "No handler registered for event");
        }
    }

    /// Removes every handler.
    pub fn reset(&self) {
        let mut handlers = self.write();
        let removed = handlers.len();
        handlers.clear();
        tracing::debug!(removed, "Event router reset");
    }

    /// Whether a handler is registered for `name`.
    pub fn is_defined(&self, name: EventName) -> bool {
        self.read().contains_key(&name)
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.read().len()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(DiagnosticsMode::from_build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::realtime::{CardMovedPayload, TestBroadcastPayload};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Value) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move |_: &Value| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_invokes_registered_handler_once() {
        let router = EventRouter::new(DiagnosticsMode::Development);
        let (count, handler) = counter();
        router.define(EventName::TestBroadcast, handler);

        let outcome = router.dispatch("TestBroadcast", &json!({"message": "hi"}));

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_passes_payload_unchanged() {
        let router = EventRouter::new(DiagnosticsMode::Development);
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        router.define(EventName::CardMoved, move |payload| {
            *s.lock().unwrap() = Some(payload.clone());
        });

        let payload = json!({"post_id": 1, "extra": [1, 2, 3]});
        router.dispatch("CardMoved", &payload);

        assert_eq!(seen.lock().unwrap().as_ref(), Some(&payload));
    }

    #[test]
    fn later_definition_replaces_earlier_one() {
        let router = EventRouter::new(DiagnosticsMode::Development);
        let (first, h1) = counter();
        let (second, h2) = counter();

        router.define(EventName::CardMoved, h1);
        router.define(EventName::CardMoved, h2);
        router.dispatch("CardMoved", &json!({}));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    fn unknown_event_is_unhandled_and_leaves_table_untouched() {
        let router = EventRouter::new(DiagnosticsMode::Development);
        let (count, handler) = counter();
        router.define(EventName::CardMoved, handler);

        let outcome = router.dispatch("SomethingElse", &json!({"x": 1}));

        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    fn known_but_unregistered_event_is_unhandled_in_production() {
        let router = EventRouter::new(DiagnosticsMode::Production);
        assert_eq!(
            router.dispatch("TestBroadcast", &json!({})),
            DispatchOutcome::Unhandled
        );
    }

    #[test]
    fn reset_clears_all_handlers() {
        let router = EventRouter::new(DiagnosticsMode::Development);
        let (count, handler) = counter();
        router.define(EventName::CardMoved, handler);
        router.define(EventName::TestBroadcast, |_| {});

        router.reset();

        assert_eq!(router.handler_count(), 0);
        assert!(!router.is_defined(EventName::CardMoved));
        assert_eq!(
            router.dispatch("CardMoved", &json!({})),
            DispatchOutcome::Unhandled
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_may_redefine_itself_during_dispatch() {
        let router = Arc::new(EventRouter::new(DiagnosticsMode::Development));
        let r = router.clone();
        router.define(EventName::TestBroadcast, move |_| {
            r.define(EventName::TestBroadcast, |_| {});
        });

        assert_eq!(
            router.dispatch("TestBroadcast", &json!({})),
            DispatchOutcome::Handled
        );
        assert!(router.is_defined(EventName::TestBroadcast));
    }

    #[test]
    fn typed_handler_receives_decoded_payload() {
        let router = EventRouter::new(DiagnosticsMode::Development);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        router.define_typed(EventName::TestBroadcast, move |p: TestBroadcastPayload| {
            s.lock().unwrap().push(p.message);
        });

        router.dispatch(
            "TestBroadcast",
            &json!({"message": "ping", "serverTimestamp": 1}),
        );

        assert_eq!(*seen.lock().unwrap(), vec!["ping".to_string()]);
    }

    #[test]
    fn typed_handler_skips_malformed_payload() {
        let router = EventRouter::new(DiagnosticsMode::Development);
        let (count, _) = counter();
        let c = count.clone();
        router.define_typed(EventName::CardMoved, move |_: CardMovedPayload| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let outcome = router.dispatch("CardMoved", &json!({"post_id": "not a number"}));

        // The handler slot exists, so the dispatch itself is handled.
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
