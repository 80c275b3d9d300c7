//! Error handling for AltAzKit.
//!
//! Structured error types for the layers of the controller:
//! - Hardware errors (GPIO line access)
//! - Motion errors (homing, direct moves, interlocks)
//! - Mode errors (mode task lifecycle)
//!
//! All error types use `thiserror`; the unified [`Error`] is the type
//! public APIs return.

use thiserror::Error;

use crate::axis::AxisId;

/// Errors raised by the GPIO line abstraction.
///
/// A failure to *initialize* a line is fatal at startup; a failed read or
/// write during operation is handled with the skip-and-retry-next-tick
/// policy and never crashes a control loop.
#[derive(Error, Debug, Clone)]
pub enum HardwareError {
    /// A logical output/input line could not be claimed at startup.
    #[error("Failed to initialize line '{line}': {reason}")]
    LineInit {
        /// Logical line name (e.g. "az.step").
        line: String,
        /// Backend-specific reason.
        reason: String,
    },

    /// Writing a line level failed.
    #[error("Write to line '{line}' failed")]
    WriteFailed {
        /// Logical line name.
        line: String,
    },

    /// Reading a line level failed.
    #[error("Read from line '{line}' failed")]
    ReadFailed {
        /// Logical line name.
        line: String,
    },
}

/// Errors from the motion engine.
#[derive(Error, Debug, Clone)]
pub enum MotionError {
    /// A homing phase exhausted its travel budget without the endstop
    /// changing state.
    #[error("Homing failed on {axis} during {phase}: travel budget exhausted")]
    HomingFailed {
        /// Axis being homed.
        axis: AxisId,
        /// Phase name ("approach-fast", "backoff", ...).
        phase: &'static str,
    },

    /// A direct move was refused because the endstop is contacted.
    #[error("Endstop asserted on {axis}: move refused")]
    EndstopAsserted {
        /// Axis whose switch is contacted.
        axis: AxisId,
    },

    /// The operation was cancelled cooperatively.
    #[error("Motion operation cancelled")]
    Cancelled,

    /// Underlying hardware fault.
    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

impl MotionError {
    /// True when the error is a cooperative cancellation rather than a
    /// fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MotionError::Cancelled)
    }
}

/// Errors from the mode manager.
#[derive(Error, Debug)]
pub enum ModeError {
    /// The outgoing mode task panicked instead of terminating cleanly.
    #[error("Mode task for {mode} panicked: {reason}")]
    TaskPanicked {
        /// Mode whose task failed.
        mode: String,
        /// Join error description.
        reason: String,
    },
}

/// Unified error type for AltAzKit.
#[derive(Error, Debug)]
pub enum Error {
    /// Hardware line error.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// Motion engine error.
    #[error(transparent)]
    Motion(#[from] MotionError),

    /// Mode manager error.
    #[error(transparent)]
    Mode(#[from] ModeError),

    /// Standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message.
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

/// Result type using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HardwareError::LineInit {
            line: "az.step".to_string(),
            reason: "pin busy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to initialize line 'az.step': pin busy"
        );

        let err = MotionError::HomingFailed {
            axis: AxisId::Altitude,
            phase: "approach-fast",
        };
        assert_eq!(
            err.to_string(),
            "Homing failed on altitude during approach-fast: travel budget exhausted"
        );

        let err = MotionError::EndstopAsserted {
            axis: AxisId::Azimuth,
        };
        assert_eq!(err.to_string(), "Endstop asserted on azimuth: move refused");
    }

    #[test]
    fn test_cancelled_predicate() {
        assert!(MotionError::Cancelled.is_cancelled());
        let hw: MotionError = HardwareError::WriteFailed {
            line: "alt.dir".to_string(),
        }
        .into();
        assert!(!hw.is_cancelled());
    }

    #[test]
    fn test_conversions() {
        let motion: Error = MotionError::Cancelled.into();
        assert!(matches!(motion, Error::Motion(_)));

        let hw: Error = HardwareError::ReadFailed {
            line: "az.endstop".to_string(),
        }
        .into();
        assert!(matches!(hw, Error::Hardware(_)));
    }
}
