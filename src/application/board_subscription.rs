//! Board channel subscription manager.
//!
//! Keeps at most one board channel subscribed. Switching boards leaves the
//! old channel before the new one is opened, so events from a board the user
//! navigated away from are never dispatched.
//!
//! # State machine
//!
//! ```text
//!                 subscribe(b)                 subscribe(b2 != b)
//! Unsubscribed ───────────────▶ Subscribed(b) ──────────────────▶ Subscribed(b2)
//!      ▲                              │          (leave b first)
//!      └──────────── cleanup() ───────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::domain::foundation::BoardId;
use crate::domain::realtime::{ChannelNaming, EventName, SubscriptionState};
use crate::ports::{ChannelHandle, RealtimeTransport};

use super::router::EventRouter;

/// Result of a [`BoardSubscriptionManager::subscribe`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// The board id was missing, blank or not a valid channel segment.
    Ignored,
    /// The board is already the current subscription.
    AlreadySubscribed,
    /// A new board channel is now subscribed.
    Subscribed { previous: Option<BoardId> },
}

struct ActiveBoard {
    board_id: BoardId,
    channel_name: String,
    channel: Arc<dyn ChannelHandle>,
}

/// Owns the single "current board" channel and its card-moved listener.
pub struct BoardSubscriptionManager {
    transport: Arc<dyn RealtimeTransport>,
    router: Arc<EventRouter>,
    naming: ChannelNaming,
    card_moved_label: String,
    current: Mutex<Option<ActiveBoard>>,
}

impl BoardSubscriptionManager {
    /// Creates a manager in the `Unsubscribed` state.
    ///
    /// `card_moved_label` is the listen label of the board's card-moved
    /// broadcast (`.CardMoved` for a literal event name).
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        router: Arc<EventRouter>,
        naming: ChannelNaming,
        card_moved_label: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            router,
            naming,
            card_moved_label: card_moved_label.into(),
            current: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveBoard>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to the channel of `board_id`, leaving any previous board first.
    ///
    /// Missing or blank ids and the already-subscribed id are no-ops.
    pub fn subscribe(&self, board_id: Option<&str>) -> SubscribeOutcome {
        let Some(raw) = board_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return SubscribeOutcome::Ignored;
        };
        let board_id = match BoardId::new(raw) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(board_id = raw, error = %e, "Ignoring invalid board id");
                return SubscribeOutcome::Ignored;
            }
        };

        let mut current = self.lock();

        if current.as_ref().map(|active| &active.board_id) == Some(&board_id) {
            return SubscribeOutcome::AlreadySubscribed;
        }

        let previous = current.take().map(|active| {
            self.transport.leave(&active.channel_name);
            tracing::debug!(
                board_id = %active.board_id,
                channel = %active.channel_name,
                "Left board channel"
            );
            active.board_id
        });

        let channel_name = self.naming.board(&board_id);
        let channel = self.transport.channel(&channel_name);

        let router = Arc::clone(&self.router);
        channel.listen(
            &self.card_moved_label,
            Arc::new(move |data: &Value| {
                router.dispatch_event(EventName::CardMoved, data);
            }),
        );

        tracing::info!(board_id = %board_id, channel = %channel_name, "Subscribed to board channel");

        *current = Some(ActiveBoard {
            board_id,
            channel_name,
            channel,
        });

        SubscribeOutcome::Subscribed { previous }
    }

    /// Leaves the current board channel, if any.
    ///
    /// Disconnecting the handle is best-effort: handles without the
    /// capability are simply left.
    pub fn cleanup(&self) {
        let Some(active) = self.lock().take() else {
            return;
        };

        self.transport.leave(&active.channel_name);
        match active.channel.disconnector() {
            Some(disconnector) => disconnector.disconnect(),
            None => tracing::trace!(
                channel = %active.channel_name,
                "Channel handle has no disconnect capability"
            ),
        }

        tracing::info!(board_id = %active.board_id, "Board subscription cleaned up");
    }

    /// Current state of the subscription.
    pub fn state(&self) -> SubscriptionState {
        match self.lock().as_ref() {
            Some(active) => SubscriptionState::Subscribed(active.board_id.clone()),
            None => SubscriptionState::Unsubscribed,
        }
    }

    /// Currently subscribed board, if any.
    pub fn current_board(&self) -> Option<BoardId> {
        self.lock().as_ref().map(|active| active.board_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryTransport, TransportCall};
    use crate::domain::realtime::DiagnosticsMode;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<InMemoryTransport>, Arc<EventRouter>, BoardSubscriptionManager) {
        let transport = Arc::new(InMemoryTransport::new());
        let router = EventRouter::new_shared(DiagnosticsMode::Development);
        let manager = BoardSubscriptionManager::new(
            transport.clone(),
            router.clone(),
            ChannelNaming::default(),
            ".CardMoved",
        );
        (transport, router, manager)
    }

    #[test]
    fn starts_unsubscribed() {
        let (_, _, manager) = setup();
        assert_eq!(manager.state(), SubscriptionState::Unsubscribed);
    }

    #[test]
    fn missing_or_blank_ids_are_ignored() {
        let (transport, _, manager) = setup();

        assert_eq!(manager.subscribe(None), SubscribeOutcome::Ignored);
        assert_eq!(manager.subscribe(Some("")), SubscribeOutcome::Ignored);
        assert_eq!(manager.subscribe(Some("   ")), SubscribeOutcome::Ignored);

        assert!(transport.calls().is_empty());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let (transport, _, manager) = setup();

        manager.subscribe(Some(" 42 "));

        assert!(transport.is_open("board.42"));
        assert_eq!(
            manager.subscribe(Some("42")),
            SubscribeOutcome::AlreadySubscribed
        );
    }

    #[test]
    fn invalid_ids_are_ignored() {
        let (transport, _, manager) = setup();
        assert_eq!(manager.subscribe(Some("a/b")), SubscribeOutcome::Ignored);
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn first_subscribe_opens_channel_and_listens() {
        let (transport, _, manager) = setup();

        let outcome = manager.subscribe(Some("42"));

        assert_eq!(outcome, SubscribeOutcome::Subscribed { previous: None });
        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::Channel("board.42".to_string()),
                TransportCall::Listen {
                    channel: "board.42".to_string(),
                    event: "CardMoved".to_string(),
                },
            ]
        );
        assert_eq!(manager.current_board(), Some(BoardId::new("42").unwrap()));
    }

    #[test]
    fn same_board_twice_is_a_noop() {
        let (transport, _, manager) = setup();
        manager.subscribe(Some("b1"));
        let calls_after_first = transport.calls().len();

        assert_eq!(
            manager.subscribe(Some("b1")),
            SubscribeOutcome::AlreadySubscribed
        );
        assert_eq!(transport.calls().len(), calls_after_first);
    }

    #[test]
    fn switching_boards_leaves_before_subscribing() {
        let (transport, _, manager) = setup();
        manager.subscribe(Some("b1"));
        transport.clear_calls();

        let outcome = manager.subscribe(Some("b2"));

        assert_eq!(
            outcome,
            SubscribeOutcome::Subscribed {
                previous: Some(BoardId::new("b1").unwrap())
            }
        );
        let calls = transport.calls();
        assert_eq!(calls[0], TransportCall::Leave("board.b1".to_string()));
        assert_eq!(calls[1], TransportCall::Channel("board.b2".to_string()));
    }

    #[test]
    fn card_moved_on_current_board_is_dispatched() {
        let (transport, router, manager) = setup();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        router.define(EventName::CardMoved, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        manager.subscribe(Some("b1"));
        let delivered = transport.deliver("board.b1", "CardMoved", &json!({"post_id": 1}));

        assert_eq!(delivered, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleanup_leaves_and_disconnects() {
        let (transport, _, manager) = setup();
        manager.subscribe(Some("b1"));
        transport.clear_calls();

        manager.cleanup();

        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::Leave("board.b1".to_string()),
                TransportCall::Disconnect("board.b1".to_string()),
            ]
        );
        assert_eq!(manager.state(), SubscriptionState::Unsubscribed);
    }

    #[test]
    fn cleanup_when_unsubscribed_makes_no_transport_calls() {
        let (transport, _, manager) = setup();
        manager.cleanup();
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn cleanup_tolerates_handles_without_disconnect() {
        let transport = Arc::new(InMemoryTransport::without_disconnect());
        let router = EventRouter::new_shared(DiagnosticsMode::Development);
        let manager = BoardSubscriptionManager::new(
            transport.clone(),
            router,
            ChannelNaming::default(),
            ".CardMoved",
        );
        manager.subscribe(Some("b1"));
        transport.clear_calls();

        manager.cleanup();

        assert_eq!(
            transport.calls(),
            vec![TransportCall::Leave("board.b1".to_string())]
        );
        assert_eq!(manager.state(), SubscriptionState::Unsubscribed);
    }

    #[test]
    fn resubscribe_after_cleanup_opens_channel_again() {
        let (transport, _, manager) = setup();
        manager.subscribe(Some("b1"));
        manager.cleanup();
        transport.clear_calls();

        assert_eq!(
            manager.subscribe(Some("b1")),
            SubscribeOutcome::Subscribed { previous: None }
        );
        assert_eq!(transport.calls()[0], TransportCall::Channel("board.b1".to_string()));
    }
}
