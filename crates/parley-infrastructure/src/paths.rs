//! Unified path management for parley files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/parley/            # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/parley/       # Data directory
//! ├── conversations/           # One directory per conversation
//! ├── models/                  # Imported model files (copies or links)
//! ├── models.toml              # Model catalog
//! └── logs/                    # Application logs
//!     └── parley.log.YYYY-MM-DD
//! ```

use parley_core::error::{ParleyError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "parley";

pub struct ParleyPaths;

impl ParleyPaths {
    /// Returns the parley configuration directory (e.g. `~/.config/parley/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ParleyError::config("Cannot find config directory"))
    }

    /// Returns the parley data directory (e.g. `~/.local/share/parley/`).
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ParleyError::config("Cannot find data directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn conversations_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("conversations"))
    }

    pub fn models_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("models"))
    }

    pub fn catalog_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("models.toml"))
    }

    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }
}
