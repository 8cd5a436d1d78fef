//! Domain layer containing the real-time vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (identifiers, errors)
//! - `realtime` - Event names, payloads, channel naming and label formatting

pub mod foundation;
pub mod realtime;
