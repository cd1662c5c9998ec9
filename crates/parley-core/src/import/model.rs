//! Import sources and model descriptors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What the operator picked in the selection modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSourceKind {
    /// A single model file (e.g. a `.gguf`).
    File,
    /// A folder containing model files.
    Folder,
}

/// Source descriptor handed to the gateway for a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSource {
    pub path: PathBuf,
    pub kind: ImportSourceKind,
}

impl ImportSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ImportSourceKind::File,
        }
    }

    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ImportSourceKind::Folder,
        }
    }

    /// Catalog id derived from the file or folder name.
    ///
    /// Lowercased; runs of characters outside `[a-z0-9.]` collapse to `-`.
    pub fn model_id(&self) -> String {
        model_id_from_path(&self.path)
    }

    /// Human-readable default name (the file stem).
    pub fn display_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

fn model_id_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut id = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' {
            id.push(ch);
        } else if !id.ends_with('-') {
            id.push('-');
        }
    }
    id.trim_matches('-').to_string()
}

/// How the transferred files end up in the models folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOption {
    /// Keep the original files where they are and reference them.
    #[default]
    Symlink,
    /// Copy the files into the models folder.
    Copy,
}

/// A finalized (or staged) model entry for the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Where the model files live after the transfer.
    pub location: PathBuf,
    pub size_bytes: u64,
    pub option: ImportOption,
}

/// Partial edit applied in the metadata editing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfoEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ModelDescriptor {
    /// Applies the fields present in `edit`.
    pub fn apply(&mut self, edit: ModelInfoEdit) {
        if let Some(name) = edit.name {
            self.name = name;
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if let Some(tags) = edit.tags {
            self.tags = tags;
        }
    }
}
