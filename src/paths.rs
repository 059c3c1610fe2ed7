// SPDX-License-Identifier: MPL-2.0
//! Default locations for downloaded weight files.
//!
//! # Path Resolution Order
//!
//! 1. **Explicit override** - parameter to the `_with_override()` function
//!    (for tests)
//! 2. **Environment variable** (`NAFNET_RESTORE_DATA_DIR`)
//! 3. **Platform default** - via the `dirs` crate

use std::path::PathBuf;

/// Application name used for directory naming.
pub(crate) const APP_NAME: &str = "nafnet-restore";

/// Environment variable to override the weight storage directory.
pub const ENV_DATA_DIR: &str = "NAFNET_RESTORE_DATA_DIR";

/// Returns the default directory for downloaded weight files.
///
/// # Resolution Order
///
/// 1. `NAFNET_RESTORE_DATA_DIR` environment variable (if set and non-empty)
/// 2. Platform-specific data directory:
///    - Linux: `~/.local/share/nafnet-restore/`
///    - macOS: `~/Library/Application Support/nafnet-restore/`
///    - Windows: `C:\Users\<User>\AppData\Roaming\nafnet-restore\`
///
/// Returns `None` if the data directory cannot be determined (rare edge case).
#[must_use]
pub fn default_weight_dir() -> Option<PathBuf> {
    default_weight_dir_with_override(None)
}

/// Returns the default weight directory with an optional override.
///
/// The explicit override has highest priority: when code passes a path, it
/// is always respected.
#[must_use]
pub fn default_weight_dir_with_override(override_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path);
    }

    if let Ok(env_path) = std::env::var(ENV_DATA_DIR) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    dirs::data_dir().map(|mut path| {
        path.push(APP_NAME);
        path
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to prevent parallel tests from interfering with each other's env vars
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn default_dir_contains_app_name() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::remove_var(ENV_DATA_DIR);

        if let Some(path) = default_weight_dir() {
            assert!(path.to_string_lossy().contains(APP_NAME));
        }
        // If dirs::data_dir() returns None (rare), the test passes silently
    }

    #[test]
    fn env_var_overrides_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::set_var(ENV_DATA_DIR, "/test/weights");

        assert_eq!(default_weight_dir(), Some(PathBuf::from("/test/weights")));

        std::env::remove_var(ENV_DATA_DIR);
    }

    #[test]
    fn empty_env_var_uses_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::set_var(ENV_DATA_DIR, "");

        if let Some(path) = default_weight_dir() {
            assert!(path.to_string_lossy().contains(APP_NAME));
        }

        std::env::remove_var(ENV_DATA_DIR);
    }

    #[test]
    fn override_path_takes_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        std::env::set_var(ENV_DATA_DIR, "/env/path");

        let override_path = PathBuf::from("/override/path");
        let result = default_weight_dir_with_override(Some(override_path.clone()));
        assert_eq!(result, Some(override_path));

        std::env::remove_var(ENV_DATA_DIR);
    }
}
