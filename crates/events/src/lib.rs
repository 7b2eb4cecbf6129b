//! Ledger events, commands, the activity log entry and the in-process event bus.

pub mod activity;
pub mod bus;
pub mod command;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use activity::{ActivityAction, ActivityLogEntry, EntityKind};
pub use bus::{EventBus, Subscription};
pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
