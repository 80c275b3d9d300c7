//! # AltAzKit Motion
//!
//! The motion control subsystem: per-axis target filtering, the ramped
//! step-pulse tracking loop, the endstop-aware homing state machine, and
//! the lock-protected direct-move API.
//!
//! The [`MotionEngine`] owns all per-axis state. Mode behaviors write
//! targets through [`MotionEngine::set_target`]; the background tracking
//! loops (one per axis, started once at bring-up) are the only writers of
//! axis position during normal operation. Homing and direct moves take an
//! axis's lock for their whole duration, and the tracking loop skips any
//! tick for which it cannot take that lock.

pub mod channel;
pub mod engine;
pub mod filter;
pub mod gpio;
pub mod homing;
pub mod sim;
pub mod tuning;

pub use channel::{configure_microstep, MicrostepMode, MotorChannel};
pub use engine::{AxisHardware, AxisReadout, MotionEngine};
pub use filter::{MedianRing, TargetFilter, MEDIAN_WINDOW};
pub use gpio::{DigitalInput, DigitalOutput, Endstop};
pub use tuning::{AxisTuning, HomingTuning, MotionTuning};
