//! In-memory transport adapter.
//!
//! - `InMemoryTransport` - Synchronous, recording transport for tests and demos

mod transport;

pub use transport::{InMemoryTransport, TransportCall};
