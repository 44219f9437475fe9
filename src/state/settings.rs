// SPDX-License-Identifier: MPL-2.0

use crate::config::{APP_ID, DB_PATH_ENV, PREVIEW_DEBOUNCE};
use crate::feed::SortKey;
use crate::local::LocalStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store path error: {0}")]
    StorePath(String),
}

fn default_debounce_ms() -> u64 {
    PREVIEW_DEBOUNCE.as_millis() as u64
}

/// Persistent client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Overrides the default local store location
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default = "default_debounce_ms")]
    pub preview_debounce_ms: u64,
    #[serde(default)]
    pub default_sort: SortKey,
    /// Fetch Open Graph tags over HTTP instead of the offline cards
    #[serde(default)]
    pub live_link_previews: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            store_path: None,
            preview_debounce_ms: default_debounce_ms(),
            default_sort: SortKey::default(),
            live_link_previews: false,
        }
    }
}

impl AppSettings {
    /// Get the settings file path (~/.config/io.github.sharewell.Sharewell/settings.json)
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_ID);
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        Ok(())
    }

    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }

    /// Store location: env override, then settings, then the XDG default.
    pub fn resolve_store_path(&self) -> Result<PathBuf, SettingsError> {
        if let Some(path) = std::env::var_os(DB_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        LocalStore::default_path().map_err(|e| SettingsError::StorePath(e.to_string()))
    }
}
