use anyhow::{Context, Result};
use parley_infrastructure::ParleyPaths;

use super::utils::load_config;

pub fn show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
    print!("{rendered}");
    Ok(())
}

pub fn path() -> Result<()> {
    let path = ParleyPaths::config_file().context("Failed to resolve config path")?;
    println!("{}", path.display());
    Ok(())
}
