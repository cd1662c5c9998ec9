use super::*;
use async_trait::async_trait;
use parley_core::config::AppConfig;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex as StdMutex;
use tokio::sync::Notify;

// Gateway that turns every import into a descriptor for the source and
// tracks which models have files in place. Imports fail when `failure` is
// set and optionally park until `release` is notified.
#[derive(Default)]
struct MockGateway {
    calls: StdMutex<Vec<Operation>>,
    placed: StdMutex<HashSet<String>>,
    failure: StdMutex<Option<ParleyError>>,
    hold: bool,
    entered: Notify,
    release: Notify,
}

impl MockGateway {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn holding() -> Arc<Self> {
        Arc::new(Self {
            hold: true,
            ..Self::default()
        })
    }

    fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(ParleyError::gateway("import_model", message));
    }

    fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn import_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|op| matches!(op, Operation::ImportModel { .. }))
            .count()
    }

    fn removals(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                Operation::RemoveModel { model_id } => Some(model_id.clone()),
                _ => None,
            })
            .collect()
    }

    fn has_files(&self, model_id: &str) -> bool {
        self.placed.lock().unwrap().contains(model_id)
    }
}

#[async_trait]
impl OperationGateway for MockGateway {
    async fn execute(&self, operation: Operation) -> Result<OperationOutcome> {
        self.calls.lock().unwrap().push(operation.clone());
        match operation {
            Operation::ImportModel { source, option } => {
                if self.hold {
                    self.entered.notify_one();
                    self.release.notified().await;
                }
                if let Some(error) = self.failure.lock().unwrap().clone() {
                    return Err(error);
                }
                let id = source.model_id();
                if !self.placed.lock().unwrap().insert(id.clone()) {
                    return Err(ParleyError::already_exists("Model files", id));
                }
                Ok(OperationOutcome::ModelImported {
                    model: ModelDescriptor {
                        name: source.display_name(),
                        description: String::new(),
                        tags: Vec::new(),
                        location: PathBuf::from("/models").join(&id),
                        size_bytes: 4096,
                        option,
                        id,
                    },
                })
            }
            Operation::RemoveModel { model_id } => {
                self.placed.lock().unwrap().remove(&model_id);
                Ok(OperationOutcome::Completed)
            }
            Operation::DeleteConversation { .. } => Ok(OperationOutcome::Completed),
        }
    }
}

#[derive(Default)]
struct MemoryCatalog {
    models: StdMutex<HashMap<String, ModelDescriptor>>,
    fail_saves: StdMutex<bool>,
}

impl MemoryCatalog {
    fn get(&self, id: &str) -> Option<ModelDescriptor> {
        self.models.lock().unwrap().get(id).cloned()
    }

    fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock().unwrap() = fail;
    }
}

#[async_trait]
impl ModelCatalog for MemoryCatalog {
    async fn contains(&self, model_id: &str) -> Result<bool> {
        Ok(self.models.lock().unwrap().contains_key(model_id))
    }

    async fn save(&self, model: &ModelDescriptor) -> Result<()> {
        if *self.fail_saves.lock().unwrap() {
            return Err(ParleyError::io("models.toml is read-only"));
        }
        self.models
            .lock()
            .unwrap()
            .insert(model.id.clone(), model.clone());
        Ok(())
    }

    async fn remove(&self, model_id: &str) -> Result<()> {
        self.models.lock().unwrap().remove(model_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ModelDescriptor>> {
        Ok(self.models.lock().unwrap().values().cloned().collect())
    }
}

struct Harness {
    stores: Arc<AppStores>,
    gateway: Arc<MockGateway>,
    catalog: Arc<MemoryCatalog>,
    controller: Arc<ImportWorkflowController>,
}

fn harness_with(gateway: Arc<MockGateway>, config: ImportConfig) -> Harness {
    let stores = Arc::new(AppStores::new(&AppConfig::default()));
    let catalog = Arc::new(MemoryCatalog::default());
    let controller = Arc::new(ImportWorkflowController::new(
        stores.clone(),
        gateway.clone(),
        catalog.clone(),
        config,
    ));
    Harness {
        stores,
        gateway,
        catalog,
        controller,
    }
}

fn harness(gateway: Arc<MockGateway>) -> Harness {
    harness_with(gateway, ImportConfig::default())
}

const SOURCE: &str = "/downloads/Mistral 7B.gguf";

/// Drives the workflow to MODEL_SELECTED.
fn select(controller: &ImportWorkflowController) {
    assert!(controller.begin().is_applied());
    assert!(controller.select_source(ImportSource::file(SOURCE)).is_applied());
}

#[tokio::test]
async fn test_full_import_with_metadata_edit() {
    let h = harness(MockGateway::succeeding());
    select(&h.controller);
    assert!(h.controller.set_import_option(ImportOption::Copy).is_applied());

    let outcome = h.controller.start_import().await;
    let ImportOutcome::AwaitingEdit { model } = outcome else {
        panic!("expected AwaitingEdit, got {outcome:?}");
    };
    assert_eq!(model.id, "mistral-7b");
    assert_eq!(model.option, ImportOption::Copy);
    assert_eq!(h.controller.stage(), ImportStage::EditModelInfo);

    h.controller.update_model_info(ModelInfoEdit {
        name: Some("Mistral".into()),
        tags: Some(vec!["chat".into()]),
        ..Default::default()
    });

    let outcome = h.controller.finish_edit().await;
    assert!(matches!(outcome, ImportOutcome::Completed { .. }));
    assert_eq!(h.controller.stage(), ImportStage::None);
    assert_eq!(h.controller.staged_model(), None);

    let saved = h.catalog.get("mistral-7b").unwrap();
    assert_eq!(saved.name, "Mistral");
    assert_eq!(saved.tags, vec!["chat".to_string()]);
}

#[tokio::test]
async fn test_import_without_edit_saves_and_closes() {
    let config = ImportConfig {
        edit_model_info: false,
        ..ImportConfig::default()
    };
    let h = harness_with(MockGateway::succeeding(), config);
    select(&h.controller);

    let outcome = h.controller.start_import().await;

    assert!(matches!(outcome, ImportOutcome::Completed { .. }));
    assert_eq!(h.controller.stage(), ImportStage::None);
    assert!(h.catalog.get("mistral-7b").is_some());
}

#[tokio::test]
async fn test_transfer_failure_returns_to_model_selected() {
    let h = harness(MockGateway::succeeding());
    h.gateway.fail_with("disk full");
    select(&h.controller);

    let outcome = h.controller.start_import().await;

    let ImportOutcome::Failed { stage, error } = outcome else {
        panic!("expected Failed, got {outcome:?}");
    };
    assert_eq!(stage, ImportStage::ModelSelected);
    assert!(error.is_gateway());
    assert_eq!(h.controller.stage(), ImportStage::ModelSelected);
    assert!(h.stores.import_error().get().unwrap().contains("disk full"));
    assert_eq!(h.stores.failures().latest().unwrap().operation, "import_model");
    // Source survives so the operator can retry
    assert_eq!(
        h.controller.selected_source(),
        Some(ImportSource::file(SOURCE))
    );

    h.gateway.recover();
    let outcome = h.controller.start_import().await;
    assert!(matches!(outcome, ImportOutcome::AwaitingEdit { .. }));
    assert_eq!(h.stores.import_error().get(), None);
}

#[tokio::test]
async fn test_duplicate_model_is_rejected_before_transfer() {
    let h = harness(MockGateway::succeeding());
    select(&h.controller);
    h.controller.start_import().await;
    h.controller.finish_edit().await;

    select(&h.controller);
    let outcome = h.controller.start_import().await;

    let ImportOutcome::Failed { error, .. } = outcome else {
        panic!("expected Failed, got {outcome:?}");
    };
    assert!(error.is_already_exists());
    assert_eq!(h.gateway.call_count(), 1);
    assert_eq!(h.controller.stage(), ImportStage::ModelSelected);
}

#[tokio::test]
async fn test_invalid_transitions_are_ignored() {
    let h = harness(MockGateway::succeeding());

    assert_eq!(
        h.controller.select_source(ImportSource::file(SOURCE)),
        Transition::Ignored {
            stage: ImportStage::None
        }
    );
    assert!(!h.controller.request_cancel().is_applied());
    assert!(!h.controller.confirm_cancel().await.is_applied());
    assert!(!h.controller.decline_cancel().await.is_applied());
    assert_eq!(
        h.controller.start_import().await,
        ImportOutcome::Ignored {
            stage: ImportStage::None
        }
    );
    assert_eq!(
        h.controller.finish_edit().await,
        ImportOutcome::Ignored {
            stage: ImportStage::None
        }
    );

    assert!(h.controller.begin().is_applied());
    assert!(!h.controller.begin().is_applied());
    assert!(!h.controller.set_import_option(ImportOption::Copy).is_applied());
    assert_eq!(h.controller.stage(), ImportStage::SelectingModel);
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_during_transfer_discards_late_success() {
    let h = harness(MockGateway::holding());
    select(&h.controller);

    let controller = h.controller.clone();
    let task = tokio::spawn(async move { controller.start_import().await });
    h.gateway.entered.notified().await;
    assert_eq!(h.controller.stage(), ImportStage::ImportingModel);

    assert!(h.controller.request_cancel().is_applied());
    assert_eq!(h.controller.stage(), ImportStage::ConfirmCancel);
    assert!(h.controller.confirm_cancel().await.is_applied());
    assert_eq!(h.controller.stage(), ImportStage::None);

    h.gateway.release.notify_one();
    let outcome = task.await.unwrap();

    assert_eq!(outcome, ImportOutcome::Discarded);
    assert_eq!(h.controller.stage(), ImportStage::None);
    assert_eq!(h.controller.staged_model(), None);
    assert!(h.catalog.get("mistral-7b").is_none());
    assert!(!h.gateway.has_files("mistral-7b"));
    assert_eq!(h.gateway.removals(), vec!["mistral-7b".to_string()]);
}

#[tokio::test]
async fn test_cancel_during_transfer_without_edit_skips_catalog() {
    let config = ImportConfig {
        edit_model_info: false,
        ..ImportConfig::default()
    };
    let h = harness_with(MockGateway::holding(), config);
    select(&h.controller);

    let controller = h.controller.clone();
    let task = tokio::spawn(async move { controller.start_import().await });
    h.gateway.entered.notified().await;

    h.controller.request_cancel();
    h.controller.confirm_cancel().await;
    h.gateway.release.notify_one();

    assert_eq!(task.await.unwrap(), ImportOutcome::Discarded);
    assert_eq!(h.controller.stage(), ImportStage::None);
    assert!(h.catalog.get("mistral-7b").is_none());
    assert!(!h.gateway.has_files("mistral-7b"));
}

#[tokio::test]
async fn test_save_failure_without_edit_allows_retry() {
    let config = ImportConfig {
        edit_model_info: false,
        ..ImportConfig::default()
    };
    let h = harness_with(MockGateway::succeeding(), config);
    h.catalog.set_fail_saves(true);
    select(&h.controller);

    let outcome = h.controller.start_import().await;

    assert!(matches!(
        outcome,
        ImportOutcome::Failed {
            stage: ImportStage::ModelSelected,
            ..
        }
    ));
    assert_eq!(h.stores.failures().latest().unwrap().operation, "save_model");
    assert!(!h.gateway.has_files("mistral-7b"));
    assert_eq!(h.controller.staged_model(), None);

    h.catalog.set_fail_saves(false);
    let outcome = h.controller.start_import().await;

    assert!(matches!(outcome, ImportOutcome::Completed { .. }));
    assert_eq!(h.gateway.import_count(), 2);
    assert!(h.gateway.has_files("mistral-7b"));
    assert!(h.catalog.get("mistral-7b").is_some());
}

#[tokio::test]
async fn test_parked_success_is_removed_on_confirm() {
    let h = harness(MockGateway::holding());
    select(&h.controller);

    let controller = h.controller.clone();
    let task = tokio::spawn(async move { controller.start_import().await });
    h.gateway.entered.notified().await;
    h.controller.request_cancel();
    h.gateway.release.notify_one();
    assert_eq!(task.await.unwrap(), ImportOutcome::Parked);
    assert!(h.gateway.has_files("mistral-7b"));

    h.controller.confirm_cancel().await;

    assert_eq!(h.controller.stage(), ImportStage::None);
    assert!(!h.gateway.has_files("mistral-7b"));

    // Importing the same source again goes through
    select(&h.controller);
    h.gateway.release.notify_one();
    assert!(matches!(
        h.controller.start_import().await,
        ImportOutcome::AwaitingEdit { .. }
    ));
}

#[tokio::test]
async fn test_result_during_confirmation_is_applied_on_decline() {
    let h = harness(MockGateway::holding());
    select(&h.controller);

    let controller = h.controller.clone();
    let task = tokio::spawn(async move { controller.start_import().await });
    h.gateway.entered.notified().await;
    h.controller.request_cancel();

    h.gateway.release.notify_one();
    assert_eq!(task.await.unwrap(), ImportOutcome::Parked);
    assert_eq!(h.controller.stage(), ImportStage::ConfirmCancel);

    assert_eq!(
        h.controller.decline_cancel().await,
        Transition::Applied {
            from: ImportStage::ConfirmCancel,
            to: ImportStage::EditModelInfo,
        }
    );
    assert_eq!(h.controller.staged_model().unwrap().id, "mistral-7b");
}

#[tokio::test]
async fn test_parked_failure_is_applied_on_decline() {
    let h = harness(MockGateway::holding());
    h.gateway.fail_with("connection reset");
    select(&h.controller);

    let controller = h.controller.clone();
    let task = tokio::spawn(async move { controller.start_import().await });
    h.gateway.entered.notified().await;
    h.controller.request_cancel();
    h.gateway.release.notify_one();
    assert_eq!(task.await.unwrap(), ImportOutcome::Parked);
    // Not surfaced until the operator decides
    assert_eq!(h.stores.import_error().get(), None);

    h.controller.decline_cancel().await;

    assert_eq!(h.controller.stage(), ImportStage::ModelSelected);
    assert!(h
        .stores
        .import_error()
        .get()
        .unwrap()
        .contains("connection reset"));
    assert_eq!(h.stores.failures().len(), 1);
}

#[tokio::test]
async fn test_decline_before_result_resumes_transfer() {
    let h = harness(MockGateway::holding());
    select(&h.controller);

    let controller = h.controller.clone();
    let task = tokio::spawn(async move { controller.start_import().await });
    h.gateway.entered.notified().await;

    h.controller.request_cancel();
    assert_eq!(
        h.controller.decline_cancel().await,
        Transition::Applied {
            from: ImportStage::ConfirmCancel,
            to: ImportStage::ImportingModel,
        }
    );

    h.gateway.release.notify_one();
    assert!(matches!(
        task.await.unwrap(),
        ImportOutcome::AwaitingEdit { .. }
    ));
    assert_eq!(h.controller.stage(), ImportStage::EditModelInfo);
}

#[tokio::test]
async fn test_cancel_from_edit_stage_keeps_staged_model_on_decline() {
    let h = harness(MockGateway::succeeding());
    select(&h.controller);
    h.controller.start_import().await;

    h.controller.request_cancel();
    h.controller.decline_cancel().await;
    assert_eq!(h.controller.stage(), ImportStage::EditModelInfo);
    assert!(h.controller.staged_model().is_some());
    assert!(h.gateway.has_files("mistral-7b"));

    h.controller.request_cancel();
    h.controller.confirm_cancel().await;
    assert_eq!(h.controller.stage(), ImportStage::None);
    assert_eq!(h.controller.staged_model(), None);
    assert!(h.catalog.get("mistral-7b").is_none());
    assert!(!h.gateway.has_files("mistral-7b"));

    select(&h.controller);
    assert!(matches!(
        h.controller.start_import().await,
        ImportOutcome::AwaitingEdit { .. }
    ));
}

#[tokio::test]
async fn test_catalog_failure_keeps_editor_open() {
    let h = harness(MockGateway::succeeding());
    select(&h.controller);
    h.controller.start_import().await;
    h.catalog.set_fail_saves(true);

    let outcome = h.controller.finish_edit().await;

    assert!(matches!(
        outcome,
        ImportOutcome::Failed {
            stage: ImportStage::EditModelInfo,
            ..
        }
    ));
    assert_eq!(h.controller.stage(), ImportStage::EditModelInfo);
    assert!(h.stores.import_error().get().is_some());
    assert_eq!(h.stores.failures().latest().unwrap().operation, "save_model");

    h.catalog.set_fail_saves(false);
    assert!(matches!(
        h.controller.finish_edit().await,
        ImportOutcome::Completed { .. }
    ));
    assert_eq!(h.stores.import_error().get(), None);
}

#[tokio::test]
async fn test_stage_notifications_never_show_two_modals() {
    let h = harness(MockGateway::succeeding());
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = h
        .stores
        .import_stage()
        .subscribe(move |stage: &ImportStage| sink.lock().unwrap().push(*stage));

    select(&h.controller);
    h.controller.start_import().await;
    h.controller.request_cancel();
    h.controller.confirm_cancel().await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ImportStage::SelectingModel,
            ImportStage::ModelSelected,
            ImportStage::ImportingModel,
            ImportStage::EditModelInfo,
            ImportStage::ConfirmCancel,
            ImportStage::None,
        ]
    );
}
