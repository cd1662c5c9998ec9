//! Remote operation gateway.
//!
//! The gateway is the call boundary through which coordinators perform side
//! effects (plugin calls, backend requests). It may fail; coordinators must
//! not mutate local state until it has reported success.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::import::{ImportOption, ImportSource, ModelDescriptor};

/// A side-effecting operation executed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Delete a conversation and its persisted messages.
    DeleteConversation { conversation_id: String },
    /// Transfer a model from `source` into the local model folder.
    ImportModel {
        source: ImportSource,
        option: ImportOption,
    },
    /// Remove the files a previous import placed for `model_id`.
    ///
    /// Succeeds when nothing is left to remove.
    RemoveModel { model_id: String },
}

impl Operation {
    /// Short operation name used in logs and failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::DeleteConversation { .. } => "delete_conversation",
            Operation::ImportModel { .. } => "import_model",
            Operation::RemoveModel { .. } => "remove_model",
        }
    }

    /// Identifier of the entity the operation targets.
    pub fn target(&self) -> String {
        match self {
            Operation::DeleteConversation { conversation_id } => conversation_id.clone(),
            Operation::ImportModel { source, .. } => source.path.display().to_string(),
            Operation::RemoveModel { model_id } => model_id.clone(),
        }
    }
}

/// Successful result of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationOutcome {
    /// The operation finished and produced no data.
    Completed,
    /// A model transfer finished.
    ModelImported { model: ModelDescriptor },
}

/// The external call boundary performing delete/import side effects.
///
/// Failures are reported as `Err`; no partial success is defined.
#[async_trait]
pub trait OperationGateway: Send + Sync {
    /// Executes `operation`.
    ///
    /// # Returns
    ///
    /// - `Ok(outcome)`: the side effect happened
    /// - `Err(_)`: the side effect did not happen (or its status is unknown)
    async fn execute(&self, operation: Operation) -> Result<OperationOutcome>;
}
