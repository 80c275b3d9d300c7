//! Axis identification.
//!
//! The mount has exactly two rotational degrees of freedom. All per-axis
//! state lives in fixed two-element arrays indexed through [`AxisId`];
//! nothing in the workspace dispatches on axis name strings.

use serde::{Deserialize, Serialize};

/// One of the two mount axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisId {
    /// Horizontal rotation.
    Azimuth,
    /// Elevation above the horizon.
    Altitude,
}

impl AxisId {
    /// Both axes, in canonical order.
    pub const ALL: [AxisId; 2] = [AxisId::Azimuth, AxisId::Altitude];

    /// Index into a `[T; 2]` of per-axis state.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            AxisId::Azimuth => 0,
            AxisId::Altitude => 1,
        }
    }

    /// Short tag used in log lines.
    pub fn tag(self) -> &'static str {
        match self {
            AxisId::Azimuth => "az",
            AxisId::Altitude => "alt",
        }
    }
}

impl std::fmt::Display for AxisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisId::Azimuth => write!(f, "azimuth"),
            AxisId::Altitude => write!(f, "altitude"),
        }
    }
}
