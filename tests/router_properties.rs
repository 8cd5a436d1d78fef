//! Property tests for the event router and board switching.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::json;

use board_realtime::adapters::memory::{InMemoryTransport, TransportCall};
use board_realtime::application::{DispatchOutcome, EventRouter, RealtimeContext};
use board_realtime::domain::realtime::{DiagnosticsMode, EventName};

fn event_name() -> impl Strategy<Value = EventName> {
    prop::sample::select(EventName::ALL.to_vec())
}

fn mode() -> impl Strategy<Value = DiagnosticsMode> {
    prop_oneof![
        Just(DiagnosticsMode::Development),
        Just(DiagnosticsMode::Production)
    ]
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn last_registered_handler_wins(name in event_name(), overwrites in 1_usize..5) {
        let router = EventRouter::new(DiagnosticsMode::Production);
        let counters: Vec<Arc<AtomicUsize>> =
            (0..=overwrites).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        for counter in &counters {
            let counter = counter.clone();
            router.define(name, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        router.dispatch(name.as_str(), &json!({}));

        let (last, earlier) = counters.split_last().unwrap();
        prop_assert_eq!(last.load(Ordering::SeqCst), 1);
        for counter in earlier {
            prop_assert_eq!(counter.load(Ordering::SeqCst), 0);
        }
        prop_assert_eq!(router.handler_count(), 1);
    }

    #[test]
    fn dispatching_arbitrary_names_never_changes_the_table(
        raw in ".{0,40}",
        mode in mode(),
        registered in prop::collection::hash_set(event_name(), 0..6),
    ) {
        let router = EventRouter::new(mode);
        for name in &registered {
            router.define(*name, |_| {});
        }
        let before: Vec<bool> = EventName::ALL.iter().map(|n| router.is_defined(*n)).collect();

        let outcome = router.dispatch(&raw, &json!({"raw": raw.clone()}));

        let after: Vec<bool> = EventName::ALL.iter().map(|n| router.is_defined(*n)).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(router.handler_count(), registered.len());
        let known = raw.parse::<EventName>().ok();
        let expected = match known {
            Some(name) if registered.contains(&name) => DispatchOutcome::Handled,
            _ => DispatchOutcome::Unhandled,
        };
        prop_assert_eq!(outcome, expected);
    }

    #[test]
    fn reset_makes_every_event_unhandled(
        registered in prop::collection::hash_set(event_name(), 0..6),
        probe in event_name(),
    ) {
        let router = EventRouter::new(DiagnosticsMode::Production);
        for name in &registered {
            router.define(*name, |_| {});
        }

        router.reset();

        prop_assert_eq!(router.dispatch_event(probe, &json!(null)), DispatchOutcome::Unhandled);
        prop_assert_eq!(router.handler_count(), 0);
    }

    #[test]
    fn only_the_latest_board_delivers(boards in prop::collection::vec("[a-z0-9]{1,6}", 1..8)) {
        let transport = Arc::new(InMemoryTransport::new());
        let ctx = RealtimeContext::with_defaults(transport.clone(), DiagnosticsMode::Production);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        ctx.define(EventName::CardMoved, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        for board in &boards {
            ctx.subscribe_to_board(Some(board.as_str()));
        }

        let last = boards.last().unwrap();
        for board in &boards {
            transport.deliver(&format!("board.{}", board), "CardMoved", &json!({}));
        }
        let deliveries_to_last = boards.iter().filter(|b| *b == last).count();
        prop_assert_eq!(count.load(Ordering::SeqCst), deliveries_to_last);

        let channel_opens = transport
            .calls()
            .into_iter()
            .filter(|call| matches!(call, TransportCall::Channel(_)))
            .count();
        let mut switches = 1;
        for pair in boards.windows(2) {
            if pair[0] != pair[1] {
                switches += 1;
            }
        }
        prop_assert_eq!(channel_opens, switches);
        prop_assert_eq!(transport.open_channels(), vec![format!("board.{}", last)]);
    }
}
