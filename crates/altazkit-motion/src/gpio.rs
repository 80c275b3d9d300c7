//! GPIO line abstraction.
//!
//! The motion engine never talks to pins directly; it drives these traits.
//! Real GPIO wiring (and the simulated bench rig in [`crate::sim`]) lives
//! behind them, which keeps every control-loop path testable off-target.

use std::cell::Cell;

use altazkit_core::HardwareError;

/// A logical output line (step, direction, enable, microstep mode).
pub trait DigitalOutput {
    /// Drive the line high (`true`) or low (`false`).
    fn set(&mut self, high: bool) -> Result<(), HardwareError>;
}

/// A logical input line (endstop switch).
pub trait DigitalInput {
    /// Sample the electrical level of the line.
    fn read(&self) -> Result<bool, HardwareError>;
}

/// An endstop switch with glitch-tolerant sampling.
///
/// Physically active-low on the reference hardware; modeled here as a
/// boolean "contacted". A failed read counts as "no new sample this
/// tick": the previous state is reused and the loop carries on.
pub struct Endstop {
    line: Box<dyn DigitalInput>,
    active_low: bool,
    last: Cell<bool>,
}

impl Endstop {
    /// Wrap an input line. `active_low` matches the switch wiring.
    pub fn new(line: Box<dyn DigitalInput>, active_low: bool) -> Self {
        Self {
            line,
            active_low,
            last: Cell::new(false),
        }
    }

    /// True while the switch is contacted.
    pub fn poll(&self) -> bool {
        match self.line.read() {
            Ok(level) => {
                let asserted = if self.active_low { !level } else { level };
                self.last.set(asserted);
                asserted
            }
            Err(err) => {
                tracing::debug!("endstop read glitch, keeping last state: {err}");
                self.last.get()
            }
        }
    }
}

impl std::fmt::Debug for Endstop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endstop")
            .field("active_low", &self.active_low)
            .field("last", &self.last.get())
            .finish()
    }
}
