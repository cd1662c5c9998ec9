//! Model import domain module.
//!
//! - `stage`: the workflow state machine's states and their modals
//! - `model`: sources, options and model descriptors
//! - `catalog`: repository trait for the model catalog

mod catalog;
mod model;
mod stage;

pub use catalog::ModelCatalog;
pub use model::{ImportOption, ImportSource, ImportSourceKind, ModelDescriptor, ModelInfoEdit};
pub use stage::{ImportModal, ImportStage};
