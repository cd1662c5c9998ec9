use anyhow::{Context, Result};
use async_trait::async_trait;
use parley_application::ParleyApp;
use parley_core::conversation::ChatMessage;
use parley_core::error::Result as ParleyResult;
use parley_core::gateway::{Operation, OperationGateway, OperationOutcome};
use parley_core::import::{ImportOption, ImportSource};
use parley_infrastructure::{LocalGateway, TomlModelCatalog};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::utils::{TerminalThemeBridge, load_config, scan_conversations};

/// Delays every operation so a cancel can land while it is in flight.
struct DelayedGateway {
    inner: LocalGateway,
    delay: Duration,
}

#[async_trait]
impl OperationGateway for DelayedGateway {
    async fn execute(&self, operation: Operation) -> ParleyResult<OperationOutcome> {
        tokio::time::sleep(self.delay).await;
        self.inner.execute(operation).await
    }
}

pub async fn run() -> Result<()> {
    let scratch = std::env::temp_dir().join(format!("parley-demo-{}", uuid::Uuid::new_v4()));
    let result = run_in(&scratch).await;
    if let Err(e) = std::fs::remove_dir_all(&scratch) {
        tracing::warn!(path = %scratch.display(), error = %e, "Failed to remove scratch directory");
    }
    result
}

async fn run_in(scratch: &Path) -> Result<()> {
    let conversations_dir = scratch.join("conversations");
    let downloads = scratch.join("downloads");
    for id in ["c1", "c2"] {
        std::fs::create_dir_all(conversations_dir.join(id))?;
    }
    std::fs::create_dir_all(&downloads)?;
    let model_file = downloads.join("Demo Model.gguf");
    std::fs::write(&model_file, b"not really weights")?;

    let config = load_config().unwrap_or_default();
    let gateway = DelayedGateway {
        inner: LocalGateway::with_dirs(&conversations_dir, scratch.join("models")),
        delay: Duration::from_millis(200),
    };
    let app = Arc::new(ParleyApp::new(
        &config,
        Arc::new(gateway),
        Arc::new(TomlModelCatalog::with_path(scratch.join("models.toml"))),
        Arc::new(TerminalThemeBridge),
    ));

    let _sub = app.stores.active_conversation_id().subscribe(|active| {
        println!("  [observer] active conversation -> {active:?}");
    });

    let conversations = &app.conversations;
    conversations.load_conversations(scan_conversations(&conversations_dir).await?);
    conversations.append_message(ChatMessage::user("c1", "hello"))?;
    conversations.append_message(ChatMessage::assistant("c2", "hi"))?;
    conversations.select_conversation("c1")?;
    conversations.set_prompt("unsent draft");
    conversations.set_showing_advanced_prompt(true);

    heading("A: delete the active conversation");
    println!("  outcome: {:?}", conversations.delete_active_conversation().await);
    println!("{:#?}", app.stores.snapshot());

    heading("B: delete fails when the backend no longer has it");
    conversations.select_conversation("c2")?;
    conversations.set_prompt("keep me");
    std::fs::remove_dir_all(conversations_dir.join("c2"))?;
    println!("  outcome: {:?}", conversations.delete_active_conversation().await);
    println!("{:#?}", app.stores.snapshot());
    let failures = serde_json::to_string_pretty(&app.stores.failures().entries())
        .context("Failed to render failure log")?;
    println!("  failure log: {failures}");

    heading("C: delete without an active conversation");
    conversations.load_conversations(Vec::new());
    println!("  outcome: {:?}", conversations.delete_active_conversation().await);

    heading("D: cancel an import while the transfer runs");
    run_cancelled_import(&app, &model_file).await?;

    heading("E: import the same file again and finish editing");
    app.import.begin();
    app.import.select_source(ImportSource::file(&model_file));
    app.import.set_import_option(ImportOption::Copy);
    println!("  outcome: {:?}", app.import.start_import().await);
    println!("  outcome: {:?}", app.import.finish_edit().await);
    println!("  stage: {}", app.import.stage());

    Ok(())
}

async fn run_cancelled_import(app: &Arc<ParleyApp>, model_file: &Path) -> Result<()> {
    app.import.begin();
    app.import.select_source(ImportSource::file(model_file));

    let task = {
        let app = app.clone();
        tokio::spawn(async move { app.import.start_import().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("  stage while transferring: {}", app.import.stage());
    println!("  request_cancel: {:?}", app.import.request_cancel());
    println!("  confirm_cancel: {:?}", app.import.confirm_cancel().await);

    let outcome = task.await.context("Import task panicked")?;
    println!("  late result: {outcome:?}");
    println!("  stage: {}", app.import.stage());
    Ok(())
}

fn heading(title: &str) {
    println!("\n== {title} ==");
}
