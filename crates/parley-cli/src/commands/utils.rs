use anyhow::{Context, Result};
use async_trait::async_trait;
use parley_application::ParleyApp;
use parley_core::config::AppConfig;
use parley_core::conversation::Conversation;
use parley_core::layout::{NativeThemeBridge, Theme};
use parley_infrastructure::{ConfigService, LocalGateway, ParleyPaths, TomlModelCatalog};
use std::path::Path;
use std::sync::Arc;

/// A terminal has no window chrome; theme changes only update the store.
pub struct TerminalThemeBridge;

#[async_trait]
impl NativeThemeBridge for TerminalThemeBridge {
    async fn apply(&self, theme: Theme) -> parley_core::Result<()> {
        tracing::debug!(%theme, "No native window, skipping theme bridge");
        Ok(())
    }
}

pub fn load_config() -> Result<AppConfig> {
    let service = ConfigService::new().context("Failed to resolve config path")?;
    service
        .get_config()
        .with_context(|| format!("Failed to load {}", service.path().display()))
}

/// Wires the app to the default data directory.
pub fn build_app(config: &AppConfig) -> Result<ParleyApp> {
    let gateway = LocalGateway::new().context("Failed to resolve data directory")?;
    let catalog = TomlModelCatalog::new().context("Failed to resolve catalog path")?;
    Ok(ParleyApp::new(
        config,
        Arc::new(gateway),
        Arc::new(catalog),
        Arc::new(TerminalThemeBridge),
    ))
}

/// Conversations stored under `dir`, as directories or `<id>.json` files.
pub async fn scan_conversations(dir: &Path) -> Result<Vec<Conversation>> {
    let mut conversations = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(conversations),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", dir.display())),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let id = if entry.file_type().await?.is_dir() {
            path.file_name()
        } else if path.extension().is_some_and(|ext| ext == "json") {
            path.file_stem()
        } else {
            None
        };
        if let Some(id) = id {
            let id = id.to_string_lossy().into_owned();
            conversations.push(Conversation::with_id(id.clone(), id));
        }
    }
    conversations.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(conversations)
}

pub fn conversations_dir() -> Result<std::path::PathBuf> {
    ParleyPaths::conversations_dir().context("Failed to resolve conversations directory")
}
