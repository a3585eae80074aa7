//! Stock change notifications: event trait, envelopes and the pub/sub bus.
//!
//! The ledger commits a line mutation first and only then publishes the
//! resulting events here. Consumers (order views, dashboards) must be
//! idempotent: delivery is at-least-once.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
