//! Model catalog repository trait.

use async_trait::async_trait;

use super::model::ModelDescriptor;
use crate::error::Result;

/// Persistence boundary for imported models.
///
/// Consulted when a transfer starts (duplicate check) and when the operator
/// finishes an import (the finalized descriptor is saved). An entry saved by
/// an import that was cancelled meanwhile is removed again.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Returns `true` if a model with `model_id` is already registered.
    async fn contains(&self, model_id: &str) -> Result<bool>;

    /// Saves a finalized descriptor, replacing any entry with the same id.
    async fn save(&self, model: &ModelDescriptor) -> Result<()>;

    /// Removes the entry for `model_id`; removing a missing entry succeeds.
    async fn remove(&self, model_id: &str) -> Result<()>;

    /// Lists every registered model.
    async fn list(&self) -> Result<Vec<ModelDescriptor>>;
}
