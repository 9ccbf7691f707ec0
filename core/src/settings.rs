//! Persistent user settings.
//!
//! Settings live in a small TOML file under the platform config directory.
//! Loading is forgiving: a missing file means defaults, a partial file fills
//! the gaps, and environment variables override both. A store built without
//! a path is ephemeral and [`Settings::persist`] becomes a no-op, which is
//! what tests and one-shot demos want.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_IDLE_DELAY_SECONDS: f32 = 1.0;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("reading settings from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing settings at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("writing settings to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing settings")]
    Serialize {
        #[source]
        source: toml::ser::Error,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Seconds of neutral idling before the variety scheduler may fire.
    pub idle_delay_seconds: f32,
    pub media_listening_enabled: bool,
    /// Case-insensitive substrings matched against media app identifiers.
    /// Empty means the built-in default list.
    pub media_app_whitelist: Vec<String>,
    path: Option<PathBuf>,
}

/// On-disk shape. Every field optional so partial files keep working across
/// versions.
#[derive(Debug, Default, Deserialize, Serialize)]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idle_delay_seconds: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_listening_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_app_whitelist: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            idle_delay_seconds: DEFAULT_IDLE_DELAY_SECONDS,
            media_listening_enabled: true,
            media_app_whitelist: Vec::new(),
            path: None,
        }
    }
}

impl Settings {
    /// Conventional location under the platform config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("perch").join("settings.toml"))
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist yet. `None` builds an ephemeral store.
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self, SettingsError> {
        let mut settings = Settings::default();
        if let Some(path) = path {
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    let file: SettingsFile =
                        toml::from_str(&text).map_err(|source| SettingsError::Parse {
                            path: path.clone(),
                            source,
                        })?;
                    settings.apply_file(file);
                    tracing::debug!(path = %path.display(), "settings loaded");
                }
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "no settings file; using defaults");
                }
                Err(source) => return Err(SettingsError::Read { path, source }),
            }
            settings.path = Some(path);
        }
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Write back to the bound path. Ephemeral stores do nothing.
    pub fn persist(&self) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = SettingsFile {
            idle_delay_seconds: Some(self.idle_delay_seconds),
            media_listening_enabled: Some(self.media_listening_enabled),
            media_app_whitelist: Some(self.media_app_whitelist.clone()),
        };
        let text =
            toml::to_string_pretty(&file).map_err(|source| SettingsError::Serialize { source })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: path.clone(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| SettingsError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "settings persisted");
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Idle re-arm delay, guarded against nonsense values.
    #[must_use]
    pub fn idle_delay(&self) -> Duration {
        let seconds = self.idle_delay_seconds;
        if seconds.is_finite() && seconds >= 0.0 {
            Duration::from_secs_f32(seconds)
        } else {
            Duration::from_secs_f32(DEFAULT_IDLE_DELAY_SECONDS)
        }
    }

    fn apply_file(&mut self, file: SettingsFile) {
        if let Some(value) = file.idle_delay_seconds {
            self.idle_delay_seconds = value;
        }
        if let Some(value) = file.media_listening_enabled {
            self.media_listening_enabled = value;
        }
        if let Some(value) = file.media_app_whitelist {
            self.media_app_whitelist = value;
        }
    }

    /// `PERCH_*` environment overrides, applied on top of the file. Values
    /// that fail to parse are ignored with a warning.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("PERCH_IDLE_DELAY_SECONDS") {
            match raw.trim().parse::<f32>() {
                Ok(value) => self.idle_delay_seconds = value,
                Err(_) => {
                    tracing::warn!(value = %raw, "ignoring bad PERCH_IDLE_DELAY_SECONDS")
                }
            }
        }
        if let Some(raw) = lookup("PERCH_MEDIA_LISTENING_ENABLED") {
            match raw.trim().parse::<bool>() {
                Ok(value) => self.media_listening_enabled = value,
                Err(_) => {
                    tracing::warn!(value = %raw, "ignoring bad PERCH_MEDIA_LISTENING_ENABLED")
                }
            }
        }
        if let Some(raw) = lookup("PERCH_MEDIA_APP_WHITELIST") {
            self.media_app_whitelist = raw
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect();
        }
    }
}
