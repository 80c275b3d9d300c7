//! Tuning for the mode behaviors.

use serde::{Deserialize, Serialize};

/// Mode-behavior tuning, overridable from the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlTuning {
    /// Pot changes smaller than this (raw ADC units, per axis, measured
    /// from the last accepted value) are ignored in manual mode.
    pub pot_deadband: u16,
    /// Auto-mode tick period, seconds.
    pub auto_tick_s: f64,
}

impl Default for ControlTuning {
    fn default() -> Self {
        Self {
            pot_deadband: 20,
            auto_tick_s: 1.0,
        }
    }
}
