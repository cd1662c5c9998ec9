//! TOML-based ModelCatalog implementation.

use crate::paths::ParleyPaths;
use async_trait::async_trait;
use parley_core::error::Result;
use parley_core::import::{ModelCatalog, ModelDescriptor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

/// Stores imported model descriptors as `[[models]]` entries in `models.toml`.
///
/// Writes are serialized through an async mutex; the whole file is rewritten
/// on every save or removal.
pub struct TomlModelCatalog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TomlModelCatalog {
    /// Creates a catalog at the default path (`~/.local/share/parley/models.toml`).
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ParleyPaths::catalog_file()?))
    }

    /// Creates a catalog at a custom path (for testing).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<CatalogFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CatalogFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, catalog: &CatalogFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(catalog)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl ModelCatalog for TomlModelCatalog {
    async fn contains(&self, model_id: &str) -> Result<bool> {
        let catalog = self.load().await?;
        Ok(catalog.models.iter().any(|m| m.id == model_id))
    }

    async fn save(&self, model: &ModelDescriptor) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut catalog = self.load().await?;
        match catalog.models.iter_mut().find(|m| m.id == model.id) {
            Some(existing) => *existing = model.clone(),
            None => catalog.models.push(model.clone()),
        }

        self.store(&catalog).await?;

        tracing::debug!(model_id = %model.id, path = %self.path.display(), "Saved model to catalog");
        Ok(())
    }

    async fn remove(&self, model_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut catalog = self.load().await?;
        let before = catalog.models.len();
        catalog.models.retain(|m| m.id != model_id);
        if catalog.models.len() == before {
            return Ok(());
        }
        self.store(&catalog).await?;

        tracing::debug!(model_id, path = %self.path.display(), "Removed model from catalog");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ModelDescriptor>> {
        Ok(self.load().await?.models)
    }
}
