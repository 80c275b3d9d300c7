//! Simulated bench rig.
//!
//! An in-memory model of one axis: the step line moves a virtual body one
//! step per rising edge in the latched direction, and the endstop switch
//! contacts while the body sits at or below a configured position. Used
//! by the test suites and by the demo binary in place of real GPIO.

use std::cell::RefCell;
use std::rc::Rc;

use altazkit_core::HardwareError;

use crate::channel::MotorChannel;
use crate::engine::AxisHardware;
use crate::gpio::{DigitalInput, DigitalOutput, Endstop};

#[derive(Debug)]
struct RigState {
    position: i64,
    endstop_min: i64,
    dir_forward: bool,
    enabled: bool,
    step_high: bool,
    pulses: u64,
    ms_levels: (bool, bool),
}

/// Handle to one simulated axis. Clones share the same body.
#[derive(Debug, Clone)]
pub struct SimAxis {
    state: Rc<RefCell<RigState>>,
}

impl SimAxis {
    /// A body at `start`, with the switch contacting while
    /// `position <= endstop_min`.
    pub fn new(start: i64, endstop_min: i64) -> Self {
        Self {
            state: Rc::new(RefCell::new(RigState {
                position: start,
                endstop_min,
                dir_forward: true,
                enabled: false,
                step_high: false,
                pulses: 0,
                ms_levels: (false, false),
            })),
        }
    }

    /// Physical position of the simulated body.
    pub fn position(&self) -> i64 {
        self.state.borrow().position
    }

    /// Teleport the body (test setup only).
    pub fn set_position(&self, position: i64) {
        self.state.borrow_mut().position = position;
    }

    /// Total rising edges seen on the step line.
    pub fn pulses(&self) -> u64 {
        self.state.borrow().pulses
    }

    /// Whether the coil is energized (enable line is active-low).
    pub fn coil_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    /// Levels latched on the microstep mode lines.
    pub fn microstep_levels(&self) -> (bool, bool) {
        self.state.borrow().ms_levels
    }

    fn output(&self, role: OutputRole) -> SimOutput {
        SimOutput {
            state: Rc::clone(&self.state),
            role,
        }
    }

    /// The two driver mode lines, for `configure_microstep`.
    pub fn mode_lines(&self) -> (SimOutput, SimOutput) {
        (self.output(OutputRole::Ms1), self.output(OutputRole::Ms2))
    }

    /// Assemble the motor channel and endstop for this axis.
    pub fn hardware(&self, invert_dir: bool) -> Result<AxisHardware, HardwareError> {
        let channel = MotorChannel::new(
            Box::new(self.output(OutputRole::Step)),
            Box::new(self.output(OutputRole::Dir)),
            Box::new(self.output(OutputRole::Enable)),
            invert_dir,
        )?;
        let endstop = Endstop::new(
            Box::new(SimEndstop {
                state: Rc::clone(&self.state),
            }),
            true,
        );
        Ok(AxisHardware { channel, endstop })
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputRole {
    Step,
    Dir,
    Enable,
    Ms1,
    Ms2,
}

/// One simulated output line.
#[derive(Debug)]
pub struct SimOutput {
    state: Rc<RefCell<RigState>>,
    role: OutputRole,
}

impl DigitalOutput for SimOutput {
    fn set(&mut self, high: bool) -> Result<(), HardwareError> {
        let mut rig = self.state.borrow_mut();
        match self.role {
            OutputRole::Step => {
                let rising = high && !rig.step_high;
                rig.step_high = high;
                if rising && rig.enabled {
                    rig.pulses += 1;
                    rig.position += if rig.dir_forward { 1 } else { -1 };
                }
            }
            OutputRole::Dir => rig.dir_forward = high,
            // Active-low enable line.
            OutputRole::Enable => rig.enabled = !high,
            OutputRole::Ms1 => rig.ms_levels.0 = high,
            OutputRole::Ms2 => rig.ms_levels.1 = high,
        }
        Ok(())
    }
}

struct SimEndstop {
    state: Rc<RefCell<RigState>>,
}

impl DigitalInput for SimEndstop {
    fn read(&self) -> Result<bool, HardwareError> {
        let rig = self.state.borrow();
        // Active-low switch: low level while contacted.
        Ok(rig.position > rig.endstop_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_edges_move_the_body() {
        let axis = SimAxis::new(10, 0);
        let hw = axis.hardware(false).unwrap();
        let mut channel = hw.channel;

        channel.enable(true).unwrap();
        channel.set_direction(false).unwrap();
        channel.pulse().unwrap();
        channel.pulse().unwrap();
        assert_eq!(axis.position(), 8);
        assert_eq!(axis.pulses(), 2);

        channel.set_direction(true).unwrap();
        channel.pulse().unwrap();
        assert_eq!(axis.position(), 9);
    }

    #[test]
    fn test_disabled_coil_ignores_pulses() {
        let axis = SimAxis::new(10, 0);
        let hw = axis.hardware(false).unwrap();
        let mut channel = hw.channel;
        channel.set_direction(true).unwrap();
        channel.pulse().unwrap();
        assert_eq!(axis.position(), 10, "no torque without the coil");
    }

    #[test]
    fn test_endstop_contacts_at_threshold() {
        let axis = SimAxis::new(1, 0);
        let hw = axis.hardware(false).unwrap();
        assert!(!hw.endstop.poll());
        axis.set_position(0);
        assert!(hw.endstop.poll());
        axis.set_position(-3);
        assert!(hw.endstop.poll());
    }
}
