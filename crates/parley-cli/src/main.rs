use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley CLI - conversations and local model imports", long_about = None)]
struct Cli {
    /// Also write a daily rolling log file to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the delete and import scenarios against a scratch data directory
    Demo,
    /// Manage stored conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// Import a model file or folder into the local catalog
    Import(commands::import::ImportArgs),
    /// List imported models
    Models,
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConversationAction {
    /// List conversation ids
    List,
    /// Delete a conversation and its messages
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = parley_infrastructure::init_tracing(parley_infrastructure::LoggingOptions {
        log_dir: cli.log_dir,
        default_filter: Some("warn,parley=info".to_string()),
    })?;

    match cli.command {
        Commands::Demo => commands::demo::run().await?,
        Commands::Conversations { action } => match action {
            ConversationAction::List => commands::conversations::list().await?,
            ConversationAction::Delete { id } => commands::conversations::delete(&id).await?,
        },
        Commands::Import(args) => commands::import::run(args).await?,
        Commands::Models => commands::models::list().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show()?,
            ConfigAction::Path => commands::config::path()?,
        },
    }

    Ok(())
}
