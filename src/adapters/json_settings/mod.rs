// JSON settings adapter - persisted user settings

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Default settings file, relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "UserSetting.json";

/// Everything remembered between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSetting {
    /// Where compress and image output goes; empty means the working directory
    pub output_directory: PathBuf,
    pub encode: EncodeSettings,
    pub image: ImageSettings,
    pub encoder_path: PathBuf,
    pub probe_path: PathBuf,
    /// Root of the thumbnail and join scratch directories
    pub cache_dir: PathBuf,
    /// Concurrent encoder processes; 0 means one per logical CPU
    pub max_parallel: usize,
    pub clear_cache_on_start: bool,
}

impl Default for UserSetting {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::new(),
            encode: EncodeSettings::default(),
            image: ImageSettings::default(),
            encoder_path: PathBuf::from("ffmpeg"),
            probe_path: PathBuf::from("ffprobe"),
            cache_dir: PathBuf::from("cache"),
            max_parallel: 0,
            clear_cache_on_start: true,
        }
    }
}

impl UserSetting {
    /// Output directory with the empty value resolved to "."
    pub fn effective_output_directory(&self) -> PathBuf {
        if self.output_directory.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.output_directory.clone()
        }
    }
}

/// Loads and saves [`UserSetting`] as indented JSON
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings. A missing file is a first run; any other failure is
    /// logged. Both fall back to defaults.
    pub fn load(&self) -> UserSetting {
        match self.try_load() {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                info!("No settings at {}, starting with defaults", self.path.display());
                UserSetting::default()
            }
            Err(e) => {
                warn!("Ignoring settings at {}: {}", self.path.display(), e);
                UserSetting::default()
            }
        }
    }

    /// Save settings, logging instead of failing
    pub fn save(&self, settings: &UserSetting) {
        if let Err(e) = self.try_save(settings) {
            warn!("Could not save settings to {}: {}", self.path.display(), e);
        }
    }

    pub fn try_load(&self) -> DomainResult<Option<UserSetting>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let settings = serde_json::from_str(&content)
            .map_err(|e| DomainError::Settings(format!("Failed to parse settings: {}", e)))?;
        Ok(Some(settings))
    }

    pub fn try_save(&self, settings: &UserSetting) -> DomainResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
