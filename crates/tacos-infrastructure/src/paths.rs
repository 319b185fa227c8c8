//! Path management for tacos configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/tacos/             # Config directory
//! └── config.toml              # Adapter configuration
//!
//! ~/.local/share/tacos/        # Data directory (overridable)
//! ├── sessions/                # One TOML record per order session
//! └── mappings/                # One TOML file of index mappings per session
//! ```

use std::path::PathBuf;
use tacos_core::TacosError;

const APP_DIR: &str = "tacos";

pub struct TacosPaths;

impl TacosPaths {
    /// Returns the tacos configuration directory (e.g. `~/.config/tacos/`).
    pub fn config_dir() -> Result<PathBuf, TacosError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| TacosError::config("Cannot find config directory"))
    }

    /// Returns the default data directory (e.g. `~/.local/share/tacos/`).
    pub fn data_dir() -> Result<PathBuf, TacosError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| TacosError::config("Cannot find data directory"))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, TacosError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
