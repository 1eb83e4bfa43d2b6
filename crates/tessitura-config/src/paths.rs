//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/tessitura/config.toml`
//! - macOS: `~/Library/Application Support/tessitura/config.toml`
//! - Windows: `%APPDATA%\tessitura\config.toml`
//!
//! ```rust,no_run
//! use tessitura_config::paths;
//!
//! println!("Config file: {:?}", paths::default_config_path());
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "tessitura";

/// File name of the player configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if the platform has none.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default location of the player configuration file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Picks the configuration file to load.
///
/// An explicit path is always used. Otherwise the default path is used if
/// the file exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let path = default_config_path();
            path.is_file().then_some(path)
        }
    }
}
