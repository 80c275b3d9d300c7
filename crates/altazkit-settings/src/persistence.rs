//! Load-or-default wrapper around [`MountConfig`].
//!
//! Owns the config path and the current in-memory configuration, so
//! callers edit through it and call [`SettingsPersistence::save`] when
//! done.

use std::path::{Path, PathBuf};

use crate::config::MountConfig;
use crate::error::{SettingsError, SettingsResult};

/// A configuration bound to its on-disk location.
#[derive(Debug, Clone)]
pub struct SettingsPersistence {
    path: PathBuf,
    config: MountConfig,
}

impl SettingsPersistence {
    /// Load the config at `path`, falling back to defaults when the file
    /// does not exist yet. A file that exists but fails to parse or
    /// validate is an error, not a silent fallback.
    pub fn load_or_default(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let config = if path.exists() {
            let config = MountConfig::load_from_file(&path)
                .map_err(|err| SettingsError::LoadError(format!("{}: {err}", path.display())))?;
            tracing::info!("loaded settings from {}", path.display());
            config
        } else {
            tracing::info!("no settings at {}, using defaults", path.display());
            MountConfig::default()
        };
        Ok(Self { path, config })
    }

    /// Load from the platform default location.
    pub fn load_default() -> SettingsResult<Self> {
        Self::load_or_default(MountConfig::default_path()?)
    }

    /// Write the current configuration back to its path.
    pub fn save(&self) -> SettingsResult<()> {
        self.config
            .save_to_file(&self.path)
            .map_err(|err| SettingsError::SaveError(format!("{}: {err}", self.path.display())))?;
        tracing::info!("saved settings to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MountConfig {
        &mut self.config
    }
}
