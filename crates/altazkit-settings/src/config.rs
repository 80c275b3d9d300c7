//! Aggregate mount configuration.
//!
//! One file covers the whole system, organized into sections: tracking
//! tuning, homing tuning, per-axis wiring, and mode-behavior tuning.
//! TOML is the native format; JSON is accepted for tooling that prefers
//! it. Every field has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use altazkit_control::ControlTuning;
use altazkit_motion::{AxisTuning, HomingTuning, MotionTuning};

use crate::error::{SettingsError, SettingsResult};

/// Complete configuration for the mount controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Tracking-loop tuning shared by both axes.
    pub motion: MotionTuning,
    /// Homing-sequence tuning shared by both axes.
    pub homing: HomingTuning,
    /// Azimuth wiring and placement.
    pub azimuth: AxisTuning,
    /// Altitude wiring and placement.
    pub altitude: AxisTuning,
    /// Mode-behavior tuning.
    pub control: ControlTuning,
}

impl MountConfig {
    /// Load from a TOML or JSON file, picked by extension.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = extension(path)?;
        let contents = std::fs::read_to_string(path)?;
        let config: MountConfig = match format {
            Format::Toml => toml::from_str(&contents)?,
            Format::Json => serde_json::from_str(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Save in the format named by the file extension.
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        let contents = match extension(path)? {
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject configurations the motion engine cannot run safely.
    pub fn validate(&self) -> SettingsResult<()> {
        let m = &self.motion;
        if m.max_steps <= 0 {
            return Self::invalid("motion.max_steps", "must be positive");
        }
        if m.hold_band < 1 {
            return Self::invalid("motion.hold_band", "must be at least 1");
        }
        if m.hyst_threshold < 0 {
            return Self::invalid("motion.hyst_threshold", "must not be negative");
        }
        for (key, alpha) in [("motion.alpha_in", m.alpha_in), ("motion.alpha_ctrl", m.alpha_ctrl)] {
            if !(0.0..=1.0).contains(&alpha) {
                return Self::invalid(key, "must be within [0, 1]");
            }
        }
        if m.max_delay_s <= 0.0 || m.min_delay_s < m.max_delay_s {
            return Self::invalid(
                "motion.min_delay_s",
                "delays must be positive with min_delay_s >= max_delay_s",
            );
        }
        if m.ramp_steps < 1 {
            return Self::invalid("motion.ramp_steps", "must be at least 1");
        }

        let h = &self.homing;
        if h.fast_delay_s <= 0.0 || h.slow_delay_s <= 0.0 {
            return Self::invalid("homing.fast_delay_s", "delays must be positive");
        }
        if h.backoff_steps == 0 {
            return Self::invalid("homing.backoff_steps", "must be positive");
        }
        if (h.max_travel_steps as i64) < m.max_steps as i64 {
            return Self::invalid(
                "homing.max_travel_steps",
                "must cover at least the full travel",
            );
        }

        // Idle positions beyond the travel range are clamped on use, so
        // only a negative value is a configuration mistake.
        for (name, axis) in [("azimuth", &self.azimuth), ("altitude", &self.altitude)] {
            if axis.idle_position < 0 {
                return Self::invalid(&format!("{name}.idle_position"), "must not be negative");
            }
        }
        Ok(())
    }

    fn invalid(key: &str, reason: &str) -> SettingsResult<()> {
        Err(SettingsError::InvalidSetting {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    }

    /// Platform default location: `<config dir>/altazkit/config.toml`.
    pub fn default_path() -> SettingsResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| SettingsError::ConfigDirectory("no config directory".to_string()))?;
        Ok(base.join("altazkit").join("config.toml"))
    }
}

enum Format {
    Toml,
    Json,
}

fn extension(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}
