//! Impersonator CLI: the main entry point.
//!
//! Commands:
//! - `generate`: Impersonate the user's next message for a chat file
//! - `test`    : Generate once and show length stats
//! - `prompt`  : Print the assembled prompts without generating
//! - `preset`  : List, switch, edit, create, delete, export and import presets
//! - `settings`: Export or import the whole settings object
//! - `enable` / `disable`: Toggle impersonation
//! - `config`  : Show or initialize the configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "impersonator",
    about = "Impersonator: write the user's next chat message with a configurable preset",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file to use instead of the configured one
    #[arg(long, global = true, env = "IMPERSONATOR_SETTINGS")]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an impersonated reply for a chat
    Generate {
        /// Chat snapshot (JSON)
        #[arg(long)]
        chat: PathBuf,

        /// Suppress informational notifications
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run a test impersonation and report its length
    Test {
        #[arg(long)]
        chat: PathBuf,
    },

    /// Print the prompts that would be sent, without generating
    Prompt {
        #[arg(long)]
        chat: PathBuf,
    },

    /// Manage presets
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },

    /// Export or import all settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },

    /// Turn impersonation on
    Enable,

    /// Turn impersonation off
    Disable,

    /// Configuration file commands
    Config {
        #[command(subcommand)]
        action: commands::config_cmd::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = cli.settings;

    match cli.command {
        Commands::Generate { chat, quiet } => commands::generate::run(settings, &chat, quiet).await?,
        Commands::Test { chat } => commands::generate::test(settings, &chat).await?,
        Commands::Prompt { chat } => commands::generate::prompt(settings, &chat)?,
        Commands::Preset { action } => commands::preset::run(settings, action)?,
        Commands::Settings { action } => commands::settings::run(settings, action)?,
        Commands::Enable => commands::settings::toggle(settings, true)?,
        Commands::Disable => commands::settings::toggle(settings, false)?,
        Commands::Config { action } => commands::config_cmd::run(action)?,
    }

    Ok(())
}
