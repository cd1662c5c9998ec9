//! Import workflow against the real gateway and catalog: discarded or failed
//! imports must not leave files that block the next attempt.

use crate::{LocalGateway, TomlModelCatalog};
use async_trait::async_trait;
use parley_application::{AppStores, ImportOutcome, ImportWorkflowController};
use parley_core::config::{AppConfig, ImportConfig};
use parley_core::error::{ParleyError, Result};
use parley_core::import::{ImportSource, ImportStage, ModelCatalog, ModelDescriptor};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Catalog whose first `failing_saves` saves fail.
struct FlakyCatalog {
    inner: TomlModelCatalog,
    failing_saves: AtomicUsize,
}

#[async_trait]
impl ModelCatalog for FlakyCatalog {
    async fn contains(&self, model_id: &str) -> Result<bool> {
        self.inner.contains(model_id).await
    }

    async fn save(&self, model: &ModelDescriptor) -> Result<()> {
        let fail = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(ParleyError::io("models.toml is locked"));
        }
        self.inner.save(model).await
    }

    async fn remove(&self, model_id: &str) -> Result<()> {
        self.inner.remove(model_id).await
    }

    async fn list(&self) -> Result<Vec<ModelDescriptor>> {
        self.inner.list().await
    }
}

struct Setup {
    _root: TempDir,
    source: PathBuf,
    models_dir: PathBuf,
    catalog: Arc<FlakyCatalog>,
    controller: ImportWorkflowController,
}

fn setup(edit_model_info: bool, failing_saves: usize) -> Setup {
    let root = TempDir::new().unwrap();
    let downloads = root.path().join("downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    let source = downloads.join("Tiny Llama.gguf");
    std::fs::write(&source, b"weights").unwrap();

    let models_dir = root.path().join("models");
    let gateway = Arc::new(LocalGateway::with_dirs(
        root.path().join("conversations"),
        &models_dir,
    ));
    let catalog = Arc::new(FlakyCatalog {
        inner: TomlModelCatalog::with_path(root.path().join("models.toml")),
        failing_saves: AtomicUsize::new(failing_saves),
    });
    let config = ImportConfig {
        edit_model_info,
        ..ImportConfig::default()
    };
    let controller = ImportWorkflowController::new(
        Arc::new(AppStores::new(&AppConfig::default())),
        gateway,
        catalog.clone(),
        config,
    );

    Setup {
        _root: root,
        source,
        models_dir,
        catalog,
        controller,
    }
}

impl Setup {
    fn select(&self) {
        self.controller.begin();
        self.controller
            .select_source(ImportSource::file(&self.source));
    }

    fn model_dir(&self) -> PathBuf {
        self.models_dir.join("tiny-llama")
    }
}

#[tokio::test]
async fn test_retry_after_failed_save_imports_again() {
    let s = setup(false, 1);
    s.select();

    let outcome = s.controller.start_import().await;

    assert!(matches!(
        outcome,
        ImportOutcome::Failed {
            stage: ImportStage::ModelSelected,
            ..
        }
    ));
    assert!(!s.model_dir().exists());

    let outcome = s.controller.start_import().await;

    let ImportOutcome::Completed { model } = outcome else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert!(model.location.exists());
    assert!(s.catalog.contains("tiny-llama").await.unwrap());
    assert!(s.source.exists());
}

#[tokio::test]
async fn test_cancelled_edit_leaves_nothing_behind() {
    let s = setup(true, 0);
    s.select();
    assert!(matches!(
        s.controller.start_import().await,
        ImportOutcome::AwaitingEdit { .. }
    ));
    assert!(s.model_dir().exists());

    s.controller.request_cancel();
    s.controller.confirm_cancel().await;

    assert!(!s.model_dir().exists());
    assert!(s.catalog.list().await.unwrap().is_empty());

    s.select();
    assert!(matches!(
        s.controller.start_import().await,
        ImportOutcome::AwaitingEdit { .. }
    ));
    assert!(matches!(
        s.controller.finish_edit().await,
        ImportOutcome::Completed { .. }
    ));
}
