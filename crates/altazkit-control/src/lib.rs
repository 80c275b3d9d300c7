//! # AltAzKit Control
//!
//! The exclusive mode state machine and the mode behaviors that sit on
//! top of the motion engine. A mode is a long-running cooperative task;
//! the [`ModeManager`] guarantees at most one is alive, and that an
//! outgoing mode has finished its cleanup before its successor starts.

pub mod manager;
pub mod modes;
pub mod tuning;

pub use manager::{Mode, ModeContext, ModeExit, ModeManager};
pub use tuning::ControlTuning;
