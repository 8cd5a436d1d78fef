//! Board Realtime - real-time event routing for the project board client
//!
//! Routes named broadcast events to registered handlers, keeps the client
//! subscribed to exactly one board channel, and forwards the authenticated
//! user's private notification channel into the router.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
