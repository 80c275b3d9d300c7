//! Mount event definitions.
//!
//! Events are small, cloneable values. Subscription is keyed by
//! [`EventKind`], the payload-free discriminant of [`MountEvent`].

use serde::{Deserialize, Serialize};

use crate::axis::AxisId;

/// Everything the front end (menu, rotary, pot sampler) can tell the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountEvent {
    /// Manual mode selected from the menu.
    ManualModeEntered,
    /// Auto (tracking) mode selected from the menu.
    AutoModeEntered,
    /// Homing mode selected from the menu.
    AutoHomingEntered,
    /// Stop mode selected from the menu.
    StopModeEntered,
    /// Calibration mode selected from the menu.
    CalibrationModeEntered,
    /// A potentiometer moved past its reporting threshold.
    PotChanged {
        /// Axis the pot is wired to.
        axis: AxisId,
        /// Raw ADC reading, full scale 0..=65535.
        raw: u16,
    },
    /// The sync/OK button was pressed (one-shot calibration trigger).
    SyncOkPressed,
}

impl MountEvent {
    /// Subscription key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            MountEvent::ManualModeEntered => EventKind::ManualModeEntered,
            MountEvent::AutoModeEntered => EventKind::AutoModeEntered,
            MountEvent::AutoHomingEntered => EventKind::AutoHomingEntered,
            MountEvent::StopModeEntered => EventKind::StopModeEntered,
            MountEvent::CalibrationModeEntered => EventKind::CalibrationModeEntered,
            MountEvent::PotChanged { .. } => EventKind::PotChanged,
            MountEvent::SyncOkPressed => EventKind::SyncOkPressed,
        }
    }

    /// Short description for log lines.
    pub fn description(&self) -> String {
        match self {
            MountEvent::PotChanged { axis, raw } => {
                format!("pot_changed {}={raw}", axis.tag())
            }
            other => other.kind().to_string(),
        }
    }
}

/// Discriminant of [`MountEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Manual mode menu selection.
    ManualModeEntered,
    /// Auto mode menu selection.
    AutoModeEntered,
    /// Homing mode menu selection.
    AutoHomingEntered,
    /// Stop mode menu selection.
    StopModeEntered,
    /// Calibration mode menu selection.
    CalibrationModeEntered,
    /// Pot reading change.
    PotChanged,
    /// Sync/OK button press.
    SyncOkPressed,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::ManualModeEntered => "manual_mode_entered",
            EventKind::AutoModeEntered => "auto_mode_entered",
            EventKind::AutoHomingEntered => "auto_homing_entered",
            EventKind::StopModeEntered => "stop_mode_entered",
            EventKind::CalibrationModeEntered => "calibration_mode_entered",
            EventKind::PotChanged => "pot_changed",
            EventKind::SyncOkPressed => "sync_ok_pressed",
        };
        write!(f, "{name}")
    }
}
