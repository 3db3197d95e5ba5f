use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

pub const STATE_FILE_NAME: &str = ".bbox_viewer_state.json";

/// Last used folders, restored at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub image_dir: String,
    pub label_dir: String,
}

impl Settings {
    /// The state file beside the executable, or in the working directory
    /// when the executable path is unknown.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(STATE_FILE_NAME)
    }

    /// Reads the settings, falling back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no saved settings at {}", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("ignoring settings {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        Ok(settings.trimmed())
    }

    /// Overwrites the whole file.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("saved settings to {}", path.display());
        Ok(())
    }

    fn trimmed(self) -> Self {
        Self {
            image_dir: self.image_dir.trim().to_owned(),
            label_dir: self.label_dir.trim().to_owned(),
        }
    }
}
