use anyhow::{Result, bail};
use clap::Args;
use parley_application::ImportOutcome;
use parley_core::import::{ImportOption, ImportSource, ModelDescriptor, ModelInfoEdit};
use std::path::PathBuf;

use super::utils::{build_app, load_config};

#[derive(Args)]
pub struct ImportArgs {
    /// Model file (or folder with --folder)
    path: PathBuf,
    /// Treat the path as a folder of model files
    #[arg(long)]
    folder: bool,
    /// Copy the files instead of linking to them
    #[arg(long)]
    copy: bool,
    /// Display name for the catalog entry
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Tag for the catalog entry (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

pub async fn run(args: ImportArgs) -> Result<()> {
    let config = load_config()?;
    let app = build_app(&config)?;
    let import = &app.import;

    let source = if args.folder {
        ImportSource::folder(&args.path)
    } else {
        ImportSource::file(&args.path)
    };
    let option = if args.copy {
        ImportOption::Copy
    } else {
        config.import.default_option
    };

    import.begin();
    import.select_source(source);
    import.set_import_option(option);

    let model = match import.start_import().await {
        ImportOutcome::AwaitingEdit { .. } => {
            import.update_model_info(ModelInfoEdit {
                name: args.name,
                description: args.description,
                tags: (!args.tags.is_empty()).then_some(args.tags),
            });
            match import.finish_edit().await {
                ImportOutcome::Completed { model } => model,
                other => return report_failure(other),
            }
        }
        ImportOutcome::Completed { model } => model,
        other => return report_failure(other),
    };

    print_model(&model);
    Ok(())
}

fn report_failure(outcome: ImportOutcome) -> Result<()> {
    match outcome {
        ImportOutcome::Failed { stage, error } => bail!("Import failed at {stage}: {error}"),
        other => bail!("Import did not complete: {other:?}"),
    }
}

fn print_model(model: &ModelDescriptor) {
    println!("Imported {} ({})", model.name, model.id);
    println!("  location: {}", model.location.display());
    println!("  size:     {} bytes", model.size_bytes);
    if !model.tags.is_empty() {
        println!("  tags:     {}", model.tags.join(", "));
    }
}
