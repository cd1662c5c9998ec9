use parley_core::config::ImportConfig;
use parley_core::error::{ParleyError, Result};
use parley_core::gateway::{Operation, OperationGateway, OperationOutcome};
use parley_core::import::{
    ImportOption, ImportSource, ImportStage, ModelCatalog, ModelDescriptor, ModelInfoEdit,
};
use std::sync::{Arc, Mutex, PoisonError};

use crate::state::AppStores;

const LOG_TARGET: &str = "parley::import";

/// Result of a stage transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { from: ImportStage, to: ImportStage },
    /// The request does not apply to the current stage; nothing changed.
    Ignored { stage: ImportStage },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }
}

/// Result of an operation that waits on the gateway or the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The request does not apply to the current stage; nothing changed.
    Ignored { stage: ImportStage },
    /// The transfer finished and the metadata editor is open.
    AwaitingEdit { model: ModelDescriptor },
    /// The model was saved to the catalog and the workflow is closed.
    Completed { model: ModelDescriptor },
    /// The operation failed; the workflow sits in `stage`, from which the
    /// operator can retry or cancel.
    Failed {
        stage: ImportStage,
        error: ParleyError,
    },
    /// The result arrived while a cancel confirmation was open. It is
    /// applied if the operator declines the cancel.
    Parked,
    /// The import was cancelled (or restarted) before the result arrived.
    Discarded,
}

/// An asynchronous result waiting to be applied to the workflow.
#[derive(Debug)]
enum Settlement {
    Transfer(Result<ModelDescriptor>),
    /// A catalog save, started from `resume`: `IMPORTING_MODEL` when the
    /// metadata editor is skipped, `EDIT_MODEL_INFO` otherwise.
    Saved {
        resume: ImportStage,
        result: Result<ModelDescriptor>,
    },
}

impl Settlement {
    /// Stage the workflow must be in for the result to apply.
    fn stage(&self) -> ImportStage {
        match self {
            Settlement::Transfer(_) => ImportStage::ImportingModel,
            Settlement::Saved { resume, .. } => *resume,
        }
    }

    /// Side effects to undo when the result is not honored.
    fn into_leftover(self) -> Option<Leftover> {
        match self {
            Settlement::Transfer(Ok(model)) => Some(Leftover {
                model,
                cataloged: false,
            }),
            Settlement::Saved {
                result: Ok(model), ..
            } => Some(Leftover {
                model,
                cataloged: true,
            }),
            _ => None,
        }
    }
}

/// Transferred files (and possibly a catalog entry) nobody will use.
#[derive(Debug)]
struct Leftover {
    model: ModelDescriptor,
    cataloged: bool,
}

/// What a settled result leaves for the caller to do outside the lock.
#[derive(Debug)]
enum Settled {
    Outcome(ImportOutcome),
    /// The outcome stands once the leftover is undone.
    Undo(ImportOutcome, Leftover),
    /// The transfer was accepted; the model still has to reach the catalog.
    Persist(ModelDescriptor),
}

impl Settled {
    fn discarded(settlement: Settlement) -> Self {
        match settlement.into_leftover() {
            Some(leftover) => Settled::Undo(ImportOutcome::Discarded, leftover),
            None => Settled::Outcome(ImportOutcome::Discarded),
        }
    }
}

#[derive(Debug, Default)]
struct ImportSession {
    /// Bumped whenever in-flight work must stop being honored.
    generation: u64,
    source: Option<ImportSource>,
    option: ImportOption,
    /// Transferred model not yet in the catalog.
    staged: Option<ModelDescriptor>,
    /// A catalog save for `staged` is in flight.
    finalizing: bool,
    /// Stage to return to if a cancel request is declined.
    resume_stage: Option<ImportStage>,
    parked: Option<Settlement>,
}

impl ImportSession {
    fn reset(&mut self, option: ImportOption) {
        *self = ImportSession {
            generation: self.generation,
            option,
            ..ImportSession::default()
        };
    }
}

/// Drives the model import state machine.
///
/// ```text
/// none ──begin──▶ SELECTING_MODEL ──select_source──▶ MODEL_SELECTED
///                                                        │ start_import
///                  ┌───────── transfer failed ◀──────────┤
///                  ▼                                     ▼
///           MODEL_SELECTED                         IMPORTING_MODEL
///                                                        │ transfer ok
///                                      none ◀──finish_edit── EDIT_MODEL_INFO
///
/// any stage but none ──request_cancel──▶ CONFIRM_CANCEL
///     CONFIRM_CANCEL ──confirm_cancel──▶ none (in-flight work discarded)
///     CONFIRM_CANCEL ──decline_cancel──▶ previous stage
/// ```
///
/// The controller is the only writer of the import stage and import error
/// stores. Requests that do not apply to the current stage are ignored.
///
/// Work that will not be honored is undone: transferred files of a cancelled
/// or failed import are removed through the gateway, and a catalog entry
/// saved after the cancel was confirmed is removed from the catalog, so the
/// same source can always be imported again.
pub struct ImportWorkflowController {
    stores: Arc<AppStores>,
    gateway: Arc<dyn OperationGateway>,
    catalog: Arc<dyn ModelCatalog>,
    config: ImportConfig,
    session: Mutex<ImportSession>,
}

impl ImportWorkflowController {
    pub fn new(
        stores: Arc<AppStores>,
        gateway: Arc<dyn OperationGateway>,
        catalog: Arc<dyn ModelCatalog>,
        config: ImportConfig,
    ) -> Self {
        let session = ImportSession {
            option: config.default_option,
            ..ImportSession::default()
        };
        Self {
            stores,
            gateway,
            catalog,
            config,
            session: Mutex::new(session),
        }
    }

    pub fn stage(&self) -> ImportStage {
        self.stores.import_stage.get()
    }

    pub fn selected_source(&self) -> Option<ImportSource> {
        self.lock_session().source.clone()
    }

    pub fn import_option(&self) -> ImportOption {
        self.lock_session().option
    }

    /// The transferred model awaiting metadata edits, if any.
    pub fn staged_model(&self) -> Option<ModelDescriptor> {
        self.lock_session().staged.clone()
    }

    /// Opens the source selection modal.
    pub fn begin(&self) -> Transition {
        let default_option = self.config.default_option;
        self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            if stage != ImportStage::None {
                return ignored(stage, "begin");
            }
            session.reset(default_option);
            stores.import_error.set(None);
            advance(stores, stage, ImportStage::SelectingModel)
        })
    }

    /// Records the chosen source and opens the import options modal.
    pub fn select_source(&self, source: ImportSource) -> Transition {
        self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            if stage != ImportStage::SelectingModel {
                return ignored(stage, "select_source");
            }
            session.source = Some(source);
            advance(stores, stage, ImportStage::ModelSelected)
        })
    }

    /// Chooses between referencing and copying the model files.
    pub fn set_import_option(&self, option: ImportOption) -> Transition {
        self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            if stage != ImportStage::ModelSelected {
                return ignored(stage, "set_import_option");
            }
            session.option = option;
            Transition::Applied {
                from: stage,
                to: stage,
            }
        })
    }

    /// Starts the transfer and waits for it.
    ///
    /// The catalog is checked for a model with the same id first. On success
    /// the workflow moves to the metadata editor, or straight to `none` (after
    /// saving to the catalog) when editing is disabled. On failure it returns
    /// to `MODEL_SELECTED` with the error in the import error store, where
    /// the operator can retry or cancel.
    pub async fn start_import(&self) -> ImportOutcome {
        let started = self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            let source = match (stage, &session.source) {
                (ImportStage::ModelSelected, Some(source)) => source.clone(),
                _ => return Err(stage),
            };
            session.generation += 1;
            session.staged = None;
            session.parked = None;
            stores.import_error.set(None);
            advance(stores, stage, ImportStage::ImportingModel);
            Ok((session.generation, source, session.option))
        });

        let (generation, source, option) = match started {
            Ok(started) => started,
            Err(stage) => {
                tracing::debug!(target: LOG_TARGET, %stage, "start_import ignored");
                return ImportOutcome::Ignored { stage };
            }
        };

        tracing::info!(
            target: LOG_TARGET,
            generation,
            source = %source.path.display(),
            ?option,
            "Starting model import"
        );

        let result = self.transfer(source, option).await;
        let settled = self.settle(generation, Settlement::Transfer(result));
        self.follow_up(generation, settled).await
    }

    /// Applies a partial metadata edit to the staged model.
    pub fn update_model_info(&self, edit: ModelInfoEdit) -> Transition {
        self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            if stage != ImportStage::EditModelInfo || session.finalizing {
                return ignored(stage, "update_model_info");
            }
            match session.staged.as_mut() {
                Some(model) => {
                    model.apply(edit);
                    Transition::Applied {
                        from: stage,
                        to: stage,
                    }
                }
                None => ignored(stage, "update_model_info"),
            }
        })
    }

    /// Saves the edited model to the catalog and closes the workflow.
    ///
    /// A catalog failure keeps the editor open with the error set.
    pub async fn finish_edit(&self) -> ImportOutcome {
        let staged = self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            match (&session.staged, session.finalizing) {
                (Some(model), false) if stage == ImportStage::EditModelInfo => {
                    session.finalizing = true;
                    stores.import_error.set(None);
                    Ok((session.generation, model.clone()))
                }
                _ => Err(stage),
            }
        });

        let (generation, model) = match staged {
            Ok(staged) => staged,
            Err(stage) => {
                tracing::debug!(target: LOG_TARGET, %stage, "finish_edit ignored");
                return ImportOutcome::Ignored { stage };
            }
        };

        let result = self.catalog.save(&model).await.map(|()| model);
        let settled = self.settle(
            generation,
            Settlement::Saved {
                resume: ImportStage::EditModelInfo,
                result,
            },
        );
        self.follow_up(generation, settled).await
    }

    /// Opens the cancel confirmation from any stage but `none`.
    pub fn request_cancel(&self) -> Transition {
        self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            if !stage.can_request_cancel() {
                return ignored(stage, "request_cancel");
            }
            session.resume_stage = Some(stage);
            advance(stores, stage, ImportStage::ConfirmCancel)
        })
    }

    /// Closes the workflow and stops honoring any in-flight result.
    ///
    /// The stage moves to `none` before anything is awaited. Files of a
    /// staged or parked transfer are removed afterwards; a result still in
    /// flight is undone when it arrives.
    pub async fn confirm_cancel(&self) -> Transition {
        let default_option = self.config.default_option;
        let (transition, leftover) = self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            if stage != ImportStage::ConfirmCancel {
                return (ignored(stage, "confirm_cancel"), None);
            }

            // A parked save covers the staged model and its catalog entry
            let staged = session.staged.take().map(|model| Leftover {
                model,
                cataloged: false,
            });
            let leftover = session
                .parked
                .take()
                .and_then(Settlement::into_leftover)
                .or(staged);

            let discarded_transfer = session.resume_stage == Some(ImportStage::ImportingModel);
            session.generation += 1;
            session.reset(default_option);
            stores.import_error.set(None);
            tracing::info!(target: LOG_TARGET, discarded_transfer, "Model import cancelled");
            (advance(stores, stage, ImportStage::None), leftover)
        });

        if let Some(leftover) = leftover {
            self.undo(leftover).await;
        }
        transition
    }

    /// Returns to the stage the cancel was requested from.
    ///
    /// A result that arrived while the confirmation was open is applied now,
    /// including the catalog save that follows a transfer when the metadata
    /// editor is skipped.
    pub async fn decline_cancel(&self) -> Transition {
        let declined = self.transact(|session, stores| {
            let stage = stores.import_stage.get();
            if stage != ImportStage::ConfirmCancel {
                return Err(ignored(stage, "decline_cancel"));
            }
            let resume = session.resume_stage.take().unwrap_or_else(|| {
                tracing::warn!(target: LOG_TARGET, "No stage to resume, closing import");
                ImportStage::None
            });
            stores.import_stage.set(resume);

            let settled = match session.parked.take() {
                Some(settlement) => Some(self.apply(session, stores, settlement)),
                None => None,
            };
            Ok((session.generation, settled))
        });

        let (generation, settled) = match declined {
            Ok(declined) => declined,
            Err(transition) => return transition,
        };
        if let Some(settled) = settled {
            let outcome = self.follow_up(generation, settled).await;
            tracing::debug!(target: LOG_TARGET, ?outcome, "Applied parked import result");
        }

        Transition::Applied {
            from: ImportStage::ConfirmCancel,
            to: self.stage(),
        }
    }

    async fn transfer(&self, source: ImportSource, option: ImportOption) -> Result<ModelDescriptor> {
        let model_id = source.model_id();
        if self.catalog.contains(&model_id).await? {
            return Err(ParleyError::already_exists("Model", model_id));
        }

        let model = match self
            .gateway
            .execute(Operation::ImportModel { source, option })
            .await?
        {
            OperationOutcome::ModelImported { model } => model,
            OperationOutcome::Completed => {
                return Err(ParleyError::internal(
                    "import finished without a model descriptor",
                ));
            }
        };
        Ok(model)
    }

    /// Carries out what a settled result leaves to do, settling each
    /// further step against `generation`.
    async fn follow_up(&self, generation: u64, mut settled: Settled) -> ImportOutcome {
        loop {
            match settled {
                Settled::Outcome(outcome) => return outcome,
                Settled::Undo(outcome, leftover) => {
                    self.undo(leftover).await;
                    return outcome;
                }
                Settled::Persist(model) => {
                    let result = self.catalog.save(&model).await.map(|()| model);
                    settled = self.settle(
                        generation,
                        Settlement::Saved {
                            resume: ImportStage::ImportingModel,
                            result,
                        },
                    );
                }
            }
        }
    }

    /// Removes a leftover's catalog entry and transferred files.
    ///
    /// Failures are logged and recorded; the workflow state is not touched.
    async fn undo(&self, leftover: Leftover) {
        let model_id = leftover.model.id;
        if leftover.cataloged {
            if let Err(error) = self.catalog.remove(&model_id).await {
                tracing::error!(target: LOG_TARGET, model_id = %model_id, error = %error, "Failed to remove catalog entry of discarded import");
                self.stores.failures.record("remove_catalog_entry", &model_id, &error);
            }
        }

        let operation = Operation::RemoveModel {
            model_id: model_id.clone(),
        };
        let kind = operation.kind();
        match self.gateway.execute(operation).await {
            Ok(_) => {
                tracing::info!(target: LOG_TARGET, model_id = %model_id, "Removed files of discarded import");
            }
            Err(error) => {
                tracing::error!(target: LOG_TARGET, model_id = %model_id, error = %error, "Failed to remove files of discarded import");
                self.stores.failures.record(kind, &model_id, &error);
            }
        }
    }

    fn settle(&self, generation: u64, settlement: Settlement) -> Settled {
        self.transact(|session, stores| {
            if session.generation != generation {
                tracing::debug!(
                    target: LOG_TARGET,
                    generation,
                    current = session.generation,
                    "Ignoring stale import result"
                );
                return Settled::discarded(settlement);
            }

            let stage = stores.import_stage.get();
            let expected = settlement.stage();
            if stage == expected {
                return self.apply(session, stores, settlement);
            }
            if stage == ImportStage::ConfirmCancel && session.resume_stage == Some(expected) {
                tracing::info!(
                    target: LOG_TARGET,
                    "Result arrived during cancel confirmation, parking it"
                );
                session.parked = Some(settlement);
                return Settled::Outcome(ImportOutcome::Parked);
            }

            tracing::warn!(target: LOG_TARGET, %stage, %expected, "Dropping import result for unexpected stage");
            Settled::discarded(settlement)
        })
    }

    fn apply(
        &self,
        session: &mut ImportSession,
        stores: &AppStores,
        settlement: Settlement,
    ) -> Settled {
        session.finalizing = false;
        match settlement {
            Settlement::Transfer(Ok(model)) if self.config.edit_model_info => {
                session.staged = Some(model.clone());
                stores.import_stage.set(ImportStage::EditModelInfo);
                tracing::info!(target: LOG_TARGET, model_id = %model.id, "Model transferred, awaiting metadata edit");
                Settled::Outcome(ImportOutcome::AwaitingEdit { model })
            }
            Settlement::Transfer(Ok(model)) => {
                // Stays in IMPORTING_MODEL until the catalog save settles
                session.staged = Some(model.clone());
                session.finalizing = true;
                Settled::Persist(model)
            }
            Settlement::Saved {
                result: Ok(model), ..
            } => {
                session.reset(self.config.default_option);
                stores.import_error.set(None);
                stores.import_stage.set(ImportStage::None);
                tracing::info!(target: LOG_TARGET, model_id = %model.id, "Model import completed");
                Settled::Outcome(ImportOutcome::Completed { model })
            }
            Settlement::Transfer(Err(error)) => {
                let target = session
                    .source
                    .as_ref()
                    .map(|s| s.path.display().to_string())
                    .unwrap_or_default();
                Settled::Outcome(fail(
                    stores,
                    ImportStage::ModelSelected,
                    "import_model",
                    &target,
                    error,
                ))
            }
            Settlement::Saved {
                resume: ImportStage::ImportingModel,
                result: Err(error),
            } => {
                // Back to the options modal; the retry transfers again, so
                // the files placed by this attempt must go
                let staged = session.staged.take();
                let target = staged.as_ref().map(|m| m.id.clone()).unwrap_or_default();
                let outcome = fail(
                    stores,
                    ImportStage::ModelSelected,
                    "save_model",
                    &target,
                    error,
                );
                match staged {
                    Some(model) => Settled::Undo(
                        outcome,
                        Leftover {
                            model,
                            cataloged: false,
                        },
                    ),
                    None => Settled::Outcome(outcome),
                }
            }
            Settlement::Saved {
                result: Err(error), ..
            } => {
                let target = session
                    .staged
                    .as_ref()
                    .map(|m| m.id.clone())
                    .unwrap_or_default();
                Settled::Outcome(fail(
                    stores,
                    ImportStage::EditModelInfo,
                    "save_model",
                    &target,
                    error,
                ))
            }
        }
    }

    /// Runs `f` with the session locked, as one notification batch.
    ///
    /// The session lock is released before subscribers are notified.
    fn transact<R>(&self, f: impl FnOnce(&mut ImportSession, &AppStores) -> R) -> R {
        let stores = &self.stores;
        stores.gate.batch(|| {
            let mut session = self.lock_session();
            f(&mut session, stores)
        })
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, ImportSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn advance(stores: &AppStores, from: ImportStage, to: ImportStage) -> Transition {
    stores.import_stage.set(to);
    tracing::debug!(target: LOG_TARGET, %from, %to, "Import stage changed");
    Transition::Applied { from, to }
}

fn ignored(stage: ImportStage, request: &str) -> Transition {
    tracing::debug!(target: LOG_TARGET, %stage, request, "Transition not valid for stage, ignoring");
    Transition::Ignored { stage }
}

fn fail(
    stores: &AppStores,
    stage: ImportStage,
    operation: &str,
    target: &str,
    error: ParleyError,
) -> ImportOutcome {
    tracing::error!(target: LOG_TARGET, operation, entity = target, error = %error, "Model import step failed");
    stores.failures.record(operation, target, &error);
    stores.import_error.set(Some(error.to_string()));
    stores.import_stage.set(stage);
    ImportOutcome::Failed { stage, error }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
