// SPDX-License-Identifier: MPL-2.0
//! User settings persisted to a `settings.toml` file.
//!
//! Settings only carry overrides; every field is optional and absent fields
//! fall back to the built-in defaults (registry URL prefix, platform weight
//! directory, CPU device).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory downloaded weight files are stored in.
    #[serde(default)]
    pub weight_dir: Option<PathBuf>,
    /// Base URL the registry prepends to weight filenames.
    #[serde(default)]
    pub url_prefix: Option<String>,
    /// Default compute device ("cpu" or "cuda").
    #[serde(default)]
    pub device: Option<String>,
}

fn get_default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(crate::paths::APP_NAME);
        path.push(SETTINGS_FILE);
        path
    })
}

/// Loads settings from the platform config directory, falling back to
/// defaults when no file exists.
///
/// # Errors
///
/// Returns [`crate::error::Error::Io`] when an existing file cannot be read.
pub fn load() -> Result<Settings> {
    if let Some(path) = get_default_settings_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(Settings::default())
}

/// Saves settings to the platform config directory.
///
/// # Errors
///
/// Returns [`crate::error::Error::Io`] when the file cannot be written.
pub fn save(settings: &Settings) -> Result<()> {
    if let Some(path) = get_default_settings_path() {
        return save_to_path(settings, &path);
    }
    Ok(())
}

/// Loads settings from a specific path. Unparseable content falls back to
/// defaults.
///
/// # Errors
///
/// Returns [`crate::error::Error::Io`] when the file cannot be read.
pub fn load_from_path(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content).unwrap_or_default())
}

/// Saves settings to a specific path, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`crate::error::Error::Io`] on filesystem failure and
/// [`crate::error::Error::Config`] when serialization fails.
pub fn save_to_path(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(settings)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let settings = Settings {
            weight_dir: Some(PathBuf::from("/data/weights")),
            url_prefix: Some("http://localhost:8080/models/".to_string()),
            device: Some("cuda".to_string()),
        };
        let temp_dir = tempdir().expect("failed to create temp dir");
        let settings_path = temp_dir.path().join("nested").join("settings.toml");

        save_to_path(&settings, &settings_path).expect("failed to save settings");
        let loaded = load_from_path(&settings_path).expect("failed to load settings");

        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_from_path_returns_default_on_invalid_toml() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let settings_path = temp_dir.path().join("settings.toml");
        fs::write(&settings_path, "this is { not toml").expect("failed to write");

        let loaded = load_from_path(&settings_path).expect("load");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn default_settings_have_no_overrides() {
        let settings = Settings::default();
        assert!(settings.weight_dir.is_none());
        assert!(settings.url_prefix.is_none());
        assert!(settings.device.is_none());
    }
}
