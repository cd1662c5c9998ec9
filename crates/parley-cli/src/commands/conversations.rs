use anyhow::{Result, bail};
use parley_application::DeleteOutcome;

use super::utils::{build_app, conversations_dir, load_config, scan_conversations};

pub async fn list() -> Result<()> {
    let conversations = scan_conversations(&conversations_dir()?).await?;
    if conversations.is_empty() {
        println!("No conversations.");
    }
    for conversation in conversations {
        println!("{}", conversation.id);
    }
    Ok(())
}

pub async fn delete(id: &str) -> Result<()> {
    let config = load_config()?;
    let app = build_app(&config)?;
    app.conversations
        .load_conversations(scan_conversations(&conversations_dir()?).await?);
    app.conversations.select_conversation(id)?;

    match app.conversations.delete_active_conversation().await {
        DeleteOutcome::Deleted { conversation_id } => {
            println!("Deleted conversation {conversation_id}");
            Ok(())
        }
        DeleteOutcome::Failed { error, .. } => bail!("Delete failed: {error}"),
        other => bail!("Nothing deleted: {other:?}"),
    }
}
