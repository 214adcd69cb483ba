use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::{load_json, write_atomic, StorageError};

const SETTINGS_FILE: &str = "settings.json";
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const DATA_DIR_ENV: &str = "DOIT_DATA_DIR";
const DATA_DIR_NAME: &str = ".doit";

/// `DOIT_DATA_DIR` when set, otherwise `.doit` under the home directory (or the
/// working directory when there is no home).
pub fn resolve_data_dir(explicit: Option<OsString>, home: Option<OsString>) -> PathBuf {
    match explicit.filter(|value| !value.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => home
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(DATA_DIR_NAME),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub openweather_api_key: String,
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
    #[serde(default = "default_location")]
    pub default_location: String,
    #[serde(default)]
    pub weather_timeout_secs: Option<u64>,
    /// Drop weather responses that resolve after a newer request was issued.
    #[serde(default)]
    pub discard_stale_weather: bool,
    /// Report `NotFound` for actions that target a missing task or step.
    #[serde(default)]
    pub strict_ids: bool,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openweather_api_key: String::new(),
            weather_base_url: default_weather_base_url(),
            default_location: default_location(),
            weather_timeout_secs: None,
            discard_stale_weather: false,
            strict_ids: false,
            viewport_width: default_viewport_width(),
        }
    }
}

impl Settings {
    /// Reads `settings.json` from the data directory. A missing or unreadable file
    /// yields the defaults; the API key env var always wins over the file.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let mut settings = if path.exists() {
            match load_json::<Settings>(&path) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!("ignoring unreadable settings path={} err={err}", path.display());
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };
        if let Some(key) = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            settings.openweather_api_key = key.trim().to_string();
        }
        settings
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), StorageError> {
        std::fs::create_dir_all(data_dir)?;
        write_atomic(&data_dir.join(SETTINGS_FILE), self)
    }

    pub fn weather_timeout(&self) -> Option<Duration> {
        self.weather_timeout_secs.map(Duration::from_secs)
    }
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_location() -> String {
    "New York".to_string()
}

fn default_viewport_width() -> u32 {
    1280
}
