//! Tuning constants for the motion engine.
//!
//! Everything here is overridable from the configuration file; the
//! defaults match the reference mount hardware.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::MicrostepMode;

/// Tracking-loop tuning, shared by both axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    /// Full travel in steps; positions and targets are clamped to
    /// `[0, max_steps]`.
    pub max_steps: i32,
    /// Deltas below this never step (the hold band).
    pub hold_band: i32,
    /// Median deviations below this leave the input filter untouched.
    pub hyst_threshold: i32,
    /// EMA factor for the input stage.
    pub alpha_in: f64,
    /// EMA factor for the controller stage; 0 bypasses the stage.
    pub alpha_ctrl: f64,
    /// Slowest inter-pulse delay, seconds (ramp start).
    pub min_delay_s: f64,
    /// Fastest inter-pulse delay, seconds (ramp plateau).
    pub max_delay_s: f64,
    /// Remaining distance over which the ramp saturates.
    pub ramp_steps: i32,
    /// Coil is released after this long without movement.
    pub idle_disable_timeout_s: f64,
    /// Keep the coil energized whenever the axis is idle.
    pub always_enable: bool,
    /// Tracking-loop cadence when the axis is holding or locked out.
    pub idle_poll_s: f64,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            max_steps: 20_000,
            hold_band: 4,
            hyst_threshold: 8,
            alpha_in: 0.18,
            alpha_ctrl: 0.15,
            min_delay_s: 0.0015,
            max_delay_s: 0.0008,
            ramp_steps: 200,
            idle_disable_timeout_s: 2.0,
            always_enable: false,
            idle_poll_s: 0.05,
        }
    }
}

impl MotionTuning {
    /// Inner window where residual filter drift is forcibly zeroed.
    pub fn snap_band(&self) -> i32 {
        (self.hold_band / 2).max(1)
    }

    /// Distance-based inter-pulse delay: linear ramp from `min_delay_s`
    /// down to `max_delay_s`, saturating once `ramp_steps` remain.
    pub fn step_delay(&self, adelta: i32) -> Duration {
        let ramp = (adelta.max(0) as f64 / self.ramp_steps as f64).min(1.0);
        let delay = self.min_delay_s - (self.min_delay_s - self.max_delay_s) * ramp;
        Duration::from_secs_f64(delay.clamp(self.max_delay_s, self.min_delay_s))
    }

    /// Idle coil release timeout.
    pub fn idle_disable_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.idle_disable_timeout_s)
    }

    /// Tracking cadence while not stepping.
    pub fn idle_poll(&self) -> Duration {
        Duration::from_secs_f64(self.idle_poll_s)
    }
}

/// Homing-sequence tuning, shared by both axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomingTuning {
    /// Inter-pulse delay for the first approach, seconds.
    pub fast_delay_s: f64,
    /// Inter-pulse delay for backoff and the precise phases, seconds.
    pub slow_delay_s: f64,
    /// Fixed pulse count for the backoff phase.
    pub backoff_steps: u32,
    /// Pulse budget per seeking phase; exhausting it fails the homing
    /// rather than hammering a dead switch forever.
    pub max_travel_steps: u32,
}

impl Default for HomingTuning {
    fn default() -> Self {
        Self {
            fast_delay_s: 0.0012,
            slow_delay_s: 0.003,
            backoff_steps: 100,
            max_travel_steps: 45_000,
        }
    }
}

impl HomingTuning {
    /// Approach-fast delay.
    pub fn fast_delay(&self) -> Duration {
        Duration::from_secs_f64(self.fast_delay_s)
    }

    /// Backoff / approach-slow / final-touch delay.
    pub fn slow_delay(&self) -> Duration {
        Duration::from_secs_f64(self.slow_delay_s)
    }
}

/// Per-axis wiring and placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisTuning {
    /// Invert the direction line for this axis.
    pub invert_dir: bool,
    /// Direction of travel toward the endstop.
    pub home_forward: bool,
    /// Where a homed axis parks (recenter target). Clamped to the
    /// travel range when used.
    pub idle_position: i32,
    /// Driver microstepping mode, applied once at bring-up.
    pub microstep: MicrostepMode,
}

impl Default for AxisTuning {
    fn default() -> Self {
        Self {
            invert_dir: false,
            home_forward: false,
            idle_position: 10_000,
            microstep: MicrostepMode::default(),
        }
    }
}
