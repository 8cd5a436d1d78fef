//! Private per-user notification channel wiring.
//!
//! The private channel is not bound event by event. A single global listener
//! receives everything, drops transport-internal events, strips Echo's
//! leading `.` marker and forwards the rest to the router.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::domain::foundation::UserId;
use crate::domain::realtime::{is_reserved, strip_marker, ChannelNaming};
use crate::ports::{ChannelHandle, RealtimeTransport};

use super::router::{DispatchOutcome, EventRouter};

/// Forwards one raw transport event to the router.
///
/// Returns `None` when the event is transport-internal and was ignored.
pub fn route_transport_event(
    router: &EventRouter,
    raw_event: &str,
    payload: &Value,
) -> Option<DispatchOutcome> {
    if is_reserved(raw_event) {
        tracing::trace!(event = raw_event, "Ignoring transport-internal event");
        return None;
    }
    Some(router.dispatch(strip_marker(raw_event), payload))
}

/// Owns the subscription to `private-<user prefix>.<user id>`.
pub struct UserNotificationWiring {
    transport: Arc<dyn RealtimeTransport>,
    router: Arc<EventRouter>,
    naming: ChannelNaming,
    channel: Mutex<Option<WiredUser>>,
}

struct WiredUser {
    user_id: UserId,
    handle: Arc<dyn ChannelHandle>,
}

impl WiredUser {
    fn release(self) {
        self.handle.unbind_global();
        if let Some(disconnector) = self.handle.disconnector() {
            disconnector.disconnect();
        }
    }
}

impl UserNotificationWiring {
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        router: Arc<EventRouter>,
        naming: ChannelNaming,
    ) -> Self {
        Self {
            transport,
            router,
            naming,
            channel: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<WiredUser>> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes the user's private channel when a user is known.
    ///
    /// Returns whether the channel is wired after the call. Calling it again
    /// for the wired user does nothing. A different user replaces the wired
    /// channel; registered handlers are kept.
    pub fn start(&self, user_id: Option<&UserId>) -> bool {
        let Some(user_id) = user_id else {
            tracing::debug!("No authenticated user, skipping notification channel");
            return false;
        };

        let mut channel = self.lock();
        if channel.as_ref().is_some_and(|wired| &wired.user_id == user_id) {
            return true;
        }
        if let Some(previous) = channel.take() {
            tracing::info!(
                previous_user_id = %previous.user_id,
                user_id = %user_id,
                "Switching notification channel to another user"
            );
            previous.release();
        }

        let name = self.naming.user(user_id);
        let handle = self.transport.private(&name);

        let router = Arc::clone(&self.router);
        handle.bind_global(Arc::new(move |event: &str, payload: &Value| {
            route_transport_event(&router, event, payload);
        }));

        tracing::info!(user_id = %user_id, channel = %handle.name(), "Notification channel wired");
        *channel = Some(WiredUser {
            user_id: user_id.clone(),
            handle,
        });
        true
    }

    /// Unbinds the global listener, disconnects the channel and resets the router.
    pub fn teardown(&self) {
        if let Some(wired) = self.lock().take() {
            let name = wired.handle.name().to_string();
            wired.release();
            tracing::info!(channel = %name, "Notification channel torn down");
        }
        self.router.reset();
    }

    /// Whether the private channel is currently wired.
    pub fn is_started(&self) -> bool {
        self.lock().is_some()
    }

    /// The user whose private channel is wired.
    pub fn wired_user(&self) -> Option<UserId> {
        self.lock().as_ref().map(|wired| wired.user_id.clone())
    }
}
