//! Event bus.
//!
//! A single-context pub/sub dispatcher: handlers always run on the one
//! scheduler that owns the bus, so they need no synchronization of their
//! own. Emissions from interrupt callbacks or polling threads are
//! marshaled in through a [`RemoteEmitter`].

mod bus;
mod events;

pub use bus::{EventBus, RemoteEmitter, SubscriptionId};
pub use events::{EventKind, MountEvent};
