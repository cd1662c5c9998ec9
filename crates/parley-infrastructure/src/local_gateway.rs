//! Filesystem-backed OperationGateway.
//!
//! Executes operations against the local data directory: conversations are
//! directories (or single `<id>.json` files) under `conversations_dir`, and
//! imported models land in `models_dir/<model id>/`.

use crate::paths::ParleyPaths;
use async_trait::async_trait;
use parley_core::error::{ParleyError, Result};
use parley_core::gateway::{Operation, OperationGateway, OperationOutcome};
use parley_core::import::{ImportOption, ImportSource, ImportSourceKind, ModelDescriptor};
use std::path::{Path, PathBuf};

pub struct LocalGateway {
    conversations_dir: PathBuf,
    models_dir: PathBuf,
}

impl LocalGateway {
    /// Creates a gateway over the default data directory.
    pub fn new() -> Result<Self> {
        Ok(Self::with_dirs(
            ParleyPaths::conversations_dir()?,
            ParleyPaths::models_dir()?,
        ))
    }

    /// Creates a gateway over custom directories (for testing).
    pub fn with_dirs(conversations_dir: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            conversations_dir: conversations_dir.into(),
            models_dir: models_dir.into(),
        }
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        check_entry_name("delete_conversation", "conversation", conversation_id)?;

        let dir = self.conversations_dir.join(conversation_id);
        if tokio::fs::try_exists(&dir).await? {
            tokio::fs::remove_dir_all(&dir).await?;
            return Ok(());
        }

        let file = self.conversations_dir.join(format!("{conversation_id}.json"));
        if tokio::fs::try_exists(&file).await? {
            tokio::fs::remove_file(&file).await?;
            return Ok(());
        }

        Err(ParleyError::not_found("Conversation", conversation_id))
    }

    async fn import_model(&self, source: ImportSource, option: ImportOption) -> Result<ModelDescriptor> {
        let model_id = source.model_id();
        if model_id.is_empty() {
            return Err(ParleyError::gateway(
                "import_model",
                format!("cannot derive a model id from '{}'", source.path.display()),
            ));
        }

        let metadata = tokio::fs::metadata(&source.path).await.map_err(|e| {
            ParleyError::gateway(
                "import_model",
                format!("cannot read '{}': {e}", source.path.display()),
            )
        })?;
        let kind_matches = match source.kind {
            ImportSourceKind::File => metadata.is_file(),
            ImportSourceKind::Folder => metadata.is_dir(),
        };
        if !kind_matches {
            let expected = match source.kind {
                ImportSourceKind::File => "file",
                ImportSourceKind::Folder => "folder",
            };
            return Err(ParleyError::gateway(
                "import_model",
                format!("'{}' is not a {expected}", source.path.display()),
            ));
        }

        let target_dir = self.models_dir.join(&model_id);
        if tokio::fs::try_exists(&target_dir).await? {
            return Err(ParleyError::already_exists("Model files", model_id));
        }
        tokio::fs::create_dir_all(&target_dir).await?;

        let transferred = match self.transfer(&source, option, &target_dir).await {
            Ok(location) => total_size(&source.path).await.map(|size| (location, size)),
            Err(error) => Err(error),
        };
        match transferred {
            Ok((location, size_bytes)) => {
                tracing::info!(
                    model_id = %model_id,
                    location = %location.display(),
                    size_bytes,
                    "Transferred model files"
                );
                Ok(ModelDescriptor {
                    id: model_id,
                    name: source.display_name(),
                    description: String::new(),
                    tags: Vec::new(),
                    location,
                    size_bytes,
                    option,
                })
            }
            Err(error) => {
                if let Err(cleanup) = tokio::fs::remove_dir_all(&target_dir).await {
                    tracing::warn!(path = %target_dir.display(), error = %cleanup, "Failed to clean up partial import");
                }
                Err(error)
            }
        }
    }

    /// Removes `models_dir/<model id>/`, whatever an import left there.
    async fn remove_model(&self, model_id: &str) -> Result<()> {
        check_entry_name("remove_model", "model", model_id)?;

        let dir = self.models_dir.join(model_id);
        if !tokio::fs::try_exists(&dir).await? {
            tracing::debug!(model_id, "No model files to remove");
            return Ok(());
        }
        tokio::fs::remove_dir_all(&dir).await?;
        tracing::info!(model_id, path = %dir.display(), "Removed model files");
        Ok(())
    }

    /// Copies or links the source into `target_dir` and returns the model location.
    async fn transfer(
        &self,
        source: &ImportSource,
        option: ImportOption,
        target_dir: &Path,
    ) -> Result<PathBuf> {
        let file_name = source
            .path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("model"));

        match (option, source.kind) {
            (ImportOption::Copy, ImportSourceKind::File) => {
                let target = target_dir.join(file_name);
                tokio::fs::copy(&source.path, &target).await?;
                Ok(target)
            }
            (ImportOption::Copy, ImportSourceKind::Folder) => {
                copy_tree(&source.path, target_dir).await?;
                Ok(target_dir.to_path_buf())
            }
            (ImportOption::Symlink, _) => link(&source.path, &target_dir.join(file_name)).await,
        }
    }
}

#[async_trait]
impl OperationGateway for LocalGateway {
    async fn execute(&self, operation: Operation) -> Result<OperationOutcome> {
        tracing::debug!(operation = operation.kind(), entity = %operation.target(), "Executing operation");
        match operation {
            Operation::DeleteConversation { conversation_id } => {
                self.delete_conversation(&conversation_id).await?;
                Ok(OperationOutcome::Completed)
            }
            Operation::ImportModel { source, option } => {
                let model = self.import_model(source, option).await?;
                Ok(OperationOutcome::ModelImported { model })
            }
            Operation::RemoveModel { model_id } => {
                self.remove_model(&model_id).await?;
                Ok(OperationOutcome::Completed)
            }
        }
    }
}

/// Rejects ids that would escape their parent directory.
fn check_entry_name(operation: &str, what: &str, id: &str) -> Result<()> {
    if id.is_empty() || id.contains(['/', '\\']) || id == ".." || id == "." {
        return Err(ParleyError::gateway(operation, format!("invalid {what} id '{id}'")));
    }
    Ok(())
}

#[cfg(unix)]
async fn link(source: &Path, link_path: &Path) -> Result<PathBuf> {
    let source = tokio::fs::canonicalize(source).await?;
    tokio::fs::symlink(&source, link_path).await?;
    Ok(link_path.to_path_buf())
}

// Creating symlinks needs extra privileges on Windows; reference the source.
#[cfg(not(unix))]
async fn link(source: &Path, _link_path: &Path) -> Result<PathBuf> {
    Ok(tokio::fs::canonicalize(source).await?)
}

async fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src_dir, dst_dir)) = pending.pop() {
        tokio::fs::create_dir_all(&dst_dir).await?;
        let mut entries = tokio::fs::read_dir(&src_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let dst = dst_dir.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), dst));
            } else {
                tokio::fs::copy(entry.path(), dst).await?;
            }
        }
    }
    Ok(())
}

async fn total_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_file() {
        return Ok(metadata.len());
    }

    let mut total = 0;
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                pending.push(entry.path());
            } else {
                total += metadata.len();
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        downloads: PathBuf,
        conversations: PathBuf,
        gateway: LocalGateway,
    }

    fn fixture() -> Fixture {
        let root = TempDir::new().unwrap();
        let downloads = root.path().join("downloads");
        let conversations = root.path().join("conversations");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::create_dir_all(&conversations).unwrap();
        let gateway = LocalGateway::with_dirs(&conversations, root.path().join("models"));
        Fixture {
            _root: root,
            downloads,
            conversations,
            gateway,
        }
    }

    async fn import(gateway: &LocalGateway, source: ImportSource, option: ImportOption) -> Result<ModelDescriptor> {
        match gateway.execute(Operation::ImportModel { source, option }).await? {
            OperationOutcome::ModelImported { model } => Ok(model),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_copy_file_import() {
        let f = fixture();
        let path = f.downloads.join("Tiny Llama.gguf");
        std::fs::write(&path, b"weights").unwrap();

        let model = import(&f.gateway, ImportSource::file(&path), ImportOption::Copy)
            .await
            .unwrap();

        assert_eq!(model.id, "tiny-llama");
        assert_eq!(model.name, "Tiny Llama");
        assert_eq!(model.size_bytes, 7);
        assert_eq!(std::fs::read(&model.location).unwrap(), b"weights");
    }

    #[tokio::test]
    async fn test_copy_folder_import() {
        let f = fixture();
        let folder = f.downloads.join("phi");
        std::fs::create_dir_all(folder.join("shards")).unwrap();
        std::fs::write(folder.join("config.json"), b"{}").unwrap();
        std::fs::write(folder.join("shards").join("a.bin"), b"1234").unwrap();

        let model = import(&f.gateway, ImportSource::folder(&folder), ImportOption::Copy)
            .await
            .unwrap();

        assert_eq!(model.size_bytes, 6);
        assert!(model.location.join("shards").join("a.bin").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_import_references_source() {
        let f = fixture();
        let path = f.downloads.join("qwen.gguf");
        std::fs::write(&path, b"q").unwrap();

        let model = import(&f.gateway, ImportSource::file(&path), ImportOption::Symlink)
            .await
            .unwrap();

        let meta = std::fs::symlink_metadata(&model.location).unwrap();
        assert!(meta.file_type().is_symlink());
    }

    #[tokio::test]
    async fn test_missing_source_is_a_gateway_error() {
        let f = fixture();
        let error = import(
            &f.gateway,
            ImportSource::file(f.downloads.join("nope.gguf")),
            ImportOption::Copy,
        )
        .await
        .unwrap_err();

        assert!(error.is_gateway());
    }

    #[tokio::test]
    async fn test_second_import_of_same_model_fails() {
        let f = fixture();
        let path = f.downloads.join("m.gguf");
        std::fs::write(&path, b"m").unwrap();

        import(&f.gateway, ImportSource::file(&path), ImportOption::Copy)
            .await
            .unwrap();
        let error = import(&f.gateway, ImportSource::file(&path), ImportOption::Copy)
            .await
            .unwrap_err();
        assert!(error.is_already_exists());
    }

    #[tokio::test]
    async fn test_remove_model_allows_reimport() {
        let f = fixture();
        let path = f.downloads.join("m.gguf");
        std::fs::write(&path, b"m").unwrap();
        let model = import(&f.gateway, ImportSource::file(&path), ImportOption::Copy)
            .await
            .unwrap();

        let remove = || Operation::RemoveModel {
            model_id: model.id.clone(),
        };
        assert_eq!(f.gateway.execute(remove()).await.unwrap(), OperationOutcome::Completed);
        assert!(!model.location.exists());
        // Nothing left to remove is fine
        assert_eq!(f.gateway.execute(remove()).await.unwrap(), OperationOutcome::Completed);

        import(&f.gateway, ImportSource::file(&path), ImportOption::Copy)
            .await
            .unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_remove_model_rejects_escaping_ids() {
        let f = fixture();
        for id in ["", "..", "../downloads"] {
            let error = f
                .gateway
                .execute(Operation::RemoveModel {
                    model_id: id.to_string(),
                })
                .await
                .unwrap_err();
            assert!(error.is_gateway(), "{id:?}");
        }
        assert!(f.downloads.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_remove_symlinked_model_keeps_source() {
        let f = fixture();
        let path = f.downloads.join("qwen.gguf");
        std::fs::write(&path, b"q").unwrap();
        let model = import(&f.gateway, ImportSource::file(&path), ImportOption::Symlink)
            .await
            .unwrap();

        f.gateway
            .execute(Operation::RemoveModel { model_id: model.id })
            .await
            .unwrap();

        assert!(std::fs::symlink_metadata(&model.location).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"q");
    }

    #[tokio::test]
    async fn test_delete_conversation_directory_and_file() {
        let f = fixture();
        std::fs::create_dir_all(f.conversations.join("c1")).unwrap();
        std::fs::write(f.conversations.join("c1").join("messages.jsonl"), b"").unwrap();
        std::fs::write(f.conversations.join("c2.json"), b"{}").unwrap();

        for id in ["c1", "c2"] {
            let outcome = f
                .gateway
                .execute(Operation::DeleteConversation {
                    conversation_id: id.to_string(),
                })
                .await
                .unwrap();
            assert_eq!(outcome, OperationOutcome::Completed);
        }
        assert!(!f.conversations.join("c1").exists());
        assert!(!f.conversations.join("c2.json").exists());
    }

    #[tokio::test]
    async fn test_delete_unknown_conversation_fails() {
        let f = fixture();
        let error = f
            .gateway
            .execute(Operation::DeleteConversation {
                conversation_id: "ghost".to_string(),
            })
            .await
            .unwrap_err();
        assert!(error.is_not_found());

        let error = f
            .gateway
            .execute(Operation::DeleteConversation {
                conversation_id: "../escape".to_string(),
            })
            .await
            .unwrap_err();
        assert!(error.is_gateway());
    }
}
