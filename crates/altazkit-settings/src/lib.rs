//! # AltAzKit Settings
//!
//! Configuration file handling: the aggregate [`MountConfig`], TOML/JSON
//! load and save, validation, and the platform config directory.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::MountConfig;
pub use error::{SettingsError, SettingsResult};
pub use persistence::SettingsPersistence;
