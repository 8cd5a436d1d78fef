//! Explicitly constructed owner of the real-time state.
//!
//! Holds the router, the board subscription manager and the user channel
//! wiring for one client session. Independent contexts never share state.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ChannelConfig;
use crate::domain::foundation::{BoardId, UserId};
use crate::domain::realtime::{DiagnosticsMode, EventName, SubscriptionState};
use crate::ports::RealtimeTransport;

use super::board_subscription::{BoardSubscriptionManager, SubscribeOutcome};
use super::notification_wiring::UserNotificationWiring;
use super::router::{DispatchOutcome, EventRouter};

/// Real-time state of one client session.
///
/// # Example
///
/// ```ignore
/// let ctx = RealtimeContext::new(transport, &config.channels, DiagnosticsMode::from_build());
/// ctx.define(EventName::CardMoved, |payload| board.apply_move(payload));
/// ctx.boot(Some(user_id));
/// ctx.subscribe_to_board(Some("42"));
/// // on hot reload
/// ctx.teardown();
/// ```
pub struct RealtimeContext {
    router: Arc<EventRouter>,
    boards: BoardSubscriptionManager,
    notifications: UserNotificationWiring,
}

impl RealtimeContext {
    /// Builds a context on `transport` using the channel names in `channels`.
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        channels: &ChannelConfig,
        mode: DiagnosticsMode,
    ) -> Self {
        let router = EventRouter::new_shared(mode);
        let naming = channels.naming();
        Self {
            boards: BoardSubscriptionManager::new(
                Arc::clone(&transport),
                Arc::clone(&router),
                naming.clone(),
                channels.card_moved_label.clone(),
            ),
            notifications: UserNotificationWiring::new(transport, Arc::clone(&router), naming),
            router,
        }
    }

    /// Builds a context with the default channel names.
    pub fn with_defaults(transport: Arc<dyn RealtimeTransport>, mode: DiagnosticsMode) -> Self {
        Self::new(transport, &ChannelConfig::default(), mode)
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// See [`EventRouter::define`].
    pub fn define<F>(&self, name: EventName, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.router.define(name, handler);
    }

    /// See [`EventRouter::dispatch`].
    pub fn dispatch(&self, event: &str, payload: &Value) -> DispatchOutcome {
        self.router.dispatch(event, payload)
    }

    /// See [`EventRouter::reset`].
    pub fn reset(&self) {
        self.router.reset();
    }

    /// See [`BoardSubscriptionManager::subscribe`].
    pub fn subscribe_to_board(&self, board_id: Option<&str>) -> SubscribeOutcome {
        self.boards.subscribe(board_id)
    }

    /// See [`BoardSubscriptionManager::cleanup`].
    pub fn cleanup_board_subscription(&self) {
        self.boards.cleanup();
    }

    pub fn board_state(&self) -> SubscriptionState {
        self.boards.state()
    }

    pub fn current_board(&self) -> Option<BoardId> {
        self.boards.current_board()
    }

    /// Process start: wires the private notification channel when a user is known.
    pub fn boot(&self, user_id: Option<&UserId>) -> bool {
        self.notifications.start(user_id)
    }

    /// Hot-reload teardown: leaves the board, unwires notifications, resets the router.
    pub fn teardown(&self) {
        self.boards.cleanup();
        self.notifications.teardown();
        tracing::debug!("Realtime context torn down");
    }
}
