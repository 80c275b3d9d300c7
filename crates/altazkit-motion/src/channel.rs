//! Motor channel: the three logical output lines of one stepper driver.

use altazkit_core::HardwareError;
use serde::{Deserialize, Serialize};

use crate::gpio::DigitalOutput;

/// Microstepping mode for A4988-style drivers with two mode lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MicrostepMode {
    /// Full steps.
    Full,
    /// 1/2 steps.
    Half,
    /// 1/4 steps (hardware default).
    Quarter,
    /// 1/16 steps.
    Sixteenth,
}

impl Default for MicrostepMode {
    fn default() -> Self {
        MicrostepMode::Quarter
    }
}

impl MicrostepMode {
    /// Levels for the (MS1, MS2) lines.
    pub fn levels(self) -> (bool, bool) {
        match self {
            MicrostepMode::Full => (false, false),
            MicrostepMode::Half => (true, false),
            MicrostepMode::Quarter => (false, true),
            MicrostepMode::Sixteenth => (true, true),
        }
    }
}

/// Drive a driver's two microstep mode lines once, at bring-up.
pub fn configure_microstep(
    ms1: &mut dyn DigitalOutput,
    ms2: &mut dyn DigitalOutput,
    mode: MicrostepMode,
) -> Result<(), HardwareError> {
    let (a, b) = mode.levels();
    ms1.set(a)?;
    ms2.set(b)
}

/// One stepper driver's step/direction/enable lines.
///
/// Exclusively owned, one per axis. The enable line is active-low on the
/// reference driver board; callers only ever see the logical
/// enabled/disabled state.
pub struct MotorChannel {
    step: Box<dyn DigitalOutput>,
    dir: Box<dyn DigitalOutput>,
    enable: Box<dyn DigitalOutput>,
    invert_dir: bool,
    enabled: bool,
}

impl MotorChannel {
    /// Claim the three lines, leaving the coil de-energized.
    pub fn new(
        step: Box<dyn DigitalOutput>,
        dir: Box<dyn DigitalOutput>,
        enable: Box<dyn DigitalOutput>,
        invert_dir: bool,
    ) -> Result<Self, HardwareError> {
        let mut channel = Self {
            step,
            dir,
            enable,
            invert_dir,
            enabled: false,
        };
        channel.enable.set(true)?; // active-low: high = disabled
        Ok(channel)
    }

    /// Energize or release the coil.
    pub fn enable(&mut self, on: bool) -> Result<(), HardwareError> {
        self.enable.set(!on)?;
        self.enabled = on;
        Ok(())
    }

    /// Whether the coil is currently energized.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Latch the travel direction for subsequent pulses.
    pub fn set_direction(&mut self, forward: bool) -> Result<(), HardwareError> {
        self.dir.set(forward ^ self.invert_dir)
    }

    /// Emit one step pulse (rising then falling edge).
    pub fn pulse(&mut self) -> Result<(), HardwareError> {
        self.step.set(true)?;
        self.step.set(false)
    }

    /// Teardown: release the coil, best effort.
    pub fn release(&mut self) {
        if let Err(err) = self.enable(false) {
            tracing::warn!("failed to release motor coil: {err}");
        }
    }
}

impl std::fmt::Debug for MotorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotorChannel")
            .field("invert_dir", &self.invert_dir)
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        levels: Rc<RefCell<Vec<bool>>>,
    }

    impl DigitalOutput for Recorder {
        fn set(&mut self, high: bool) -> Result<(), HardwareError> {
            self.levels.borrow_mut().push(high);
            Ok(())
        }
    }

    fn channel(invert: bool) -> (MotorChannel, Recorder, Recorder, Recorder) {
        let (step, dir, enable) = (Recorder::default(), Recorder::default(), Recorder::default());
        let ch = MotorChannel::new(
            Box::new(step.clone()),
            Box::new(dir.clone()),
            Box::new(enable.clone()),
            invert,
        )
        .expect("channel init");
        (ch, step, dir, enable)
    }

    #[test]
    fn test_enable_is_active_low() {
        let (mut ch, _, _, enable) = channel(false);
        ch.enable(true).unwrap();
        ch.enable(false).unwrap();
        // Construction disables (high), then low, then high again.
        assert_eq!(*enable.levels.borrow(), vec![true, false, true]);
        assert!(!ch.is_enabled());
    }

    #[test]
    fn test_pulse_edges() {
        let (mut ch, step, _, _) = channel(false);
        ch.pulse().unwrap();
        ch.pulse().unwrap();
        assert_eq!(*step.levels.borrow(), vec![true, false, true, false]);
    }

    #[test]
    fn test_direction_inversion() {
        let (mut ch, _, dir, _) = channel(true);
        ch.set_direction(true).unwrap();
        ch.set_direction(false).unwrap();
        assert_eq!(*dir.levels.borrow(), vec![false, true]);
    }

    #[test]
    fn test_microstep_levels() {
        let (mut ms1, mut ms2) = (Recorder::default(), Recorder::default());
        configure_microstep(&mut ms1, &mut ms2, MicrostepMode::Quarter).unwrap();
        assert_eq!(*ms1.levels.borrow(), vec![false]);
        assert_eq!(*ms2.levels.borrow(), vec![true]);
    }
}
