//! # AltAzKit Core
//!
//! Core types shared across the AltAzKit workspace: the axis identifier,
//! the mount event vocabulary, the single-context event bus, cooperative
//! cancellation, and the error taxonomy.

pub mod axis;
pub mod cancel;
pub mod error;
pub mod event_bus;

pub use axis::AxisId;
pub use cancel::{CancelSource, CancelToken};
pub use error::{Error, HardwareError, ModeError, MotionError, Result};
pub use event_bus::{EventBus, EventKind, MountEvent, RemoteEmitter, SubscriptionId};
