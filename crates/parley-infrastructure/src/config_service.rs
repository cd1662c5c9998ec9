//! Configuration service implementation.
//!
//! Loads [`AppConfig`] from `~/.config/parley/config.toml` and caches it.

use crate::paths::ParleyPaths;
use parley_core::config::AppConfig;
use parley_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration service that loads and caches the application configuration.
///
/// A missing file yields the defaults; a malformed file is an error.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    /// Creates a service for the default config path.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ParleyPaths::config_file()?))
    }

    /// Creates a service for a custom config path (for testing).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<AppConfig> {
        {
            let cached = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let loaded = self.load()?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Writes `config` to the file and replaces the cache.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());

        tracing::debug!(path = %self.path.display(), "Saved config");
        Ok(())
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(AppConfig::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let config: AppConfig = toml::from_str(&content)?;
        tracing::debug!(path = %self.path.display(), "Loaded config");
        Ok(config)
    }
}
