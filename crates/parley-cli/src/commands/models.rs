use anyhow::{Context, Result};
use parley_core::import::ModelCatalog;
use parley_infrastructure::TomlModelCatalog;

pub async fn list() -> Result<()> {
    let catalog = TomlModelCatalog::new().context("Failed to resolve catalog path")?;
    let models = catalog.list().await.context("Failed to read model catalog")?;

    if models.is_empty() {
        println!("No models imported yet.");
        return Ok(());
    }
    for model in models {
        println!(
            "{:<32} {:<32} {:>12} bytes  {}",
            model.id,
            model.name,
            model.size_bytes,
            model.location.display()
        );
    }
    Ok(())
}
