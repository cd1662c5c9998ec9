//! Import workflow stages and the modal each one shows.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Current stage of the model import workflow.
///
/// Exactly one stage is active at a time. The rendering layer decides which
/// modal to show by calling [`ImportStage::modal`] and nothing else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStage {
    /// No import in progress.
    #[default]
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    None,
    /// The operator is choosing what to import.
    SelectingModel,
    /// A source was chosen; the operator picks how to import it.
    ModelSelected,
    /// The transfer is running.
    ImportingModel,
    /// The transfer finished; the operator may edit the model metadata.
    EditModelInfo,
    /// The operator asked to cancel and must confirm.
    ConfirmCancel,
}

/// A modal surface owned by the import workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum ImportModal {
    SelectingModel,
    ImportOptions,
    ImportingModel,
    EditModelInfo,
    CancelImport,
}

impl ImportStage {
    /// The single modal to render for this stage, if any.
    pub fn modal(self) -> Option<ImportModal> {
        match self {
            ImportStage::None => None,
            ImportStage::SelectingModel => Some(ImportModal::SelectingModel),
            ImportStage::ModelSelected => Some(ImportModal::ImportOptions),
            ImportStage::ImportingModel => Some(ImportModal::ImportingModel),
            ImportStage::EditModelInfo => Some(ImportModal::EditModelInfo),
            ImportStage::ConfirmCancel => Some(ImportModal::CancelImport),
        }
    }

    /// Returns `true` for every stage except `None`.
    pub fn is_active(self) -> bool {
        self != ImportStage::None
    }

    /// Whether a cancel request is accepted from this stage.
    pub fn can_request_cancel(self) -> bool {
        !matches!(self, ImportStage::None | ImportStage::ConfirmCancel)
    }
}
