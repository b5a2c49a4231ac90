//! Binary entry point for notecog.
//!
//! This binary provides the CLI interface for expanding and managing prompt
//! templates stored in a note vault.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use commands::{PromptAction, TemplateArgs, cmd_expand, cmd_prompt};
use notecog::cli::open_prompt_service;
use notecog::config::NotecogConfig;
use notecog::observability::{self, LoggingConfig};
use notecog::{Notifier, PromptServiceRegistry, RecordingNotifier};

/// Notecog - prompt templates over a note vault.
#[derive(Parser)]
#[command(name = "notecog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Vault root directory (overrides configuration).
    #[arg(long, global = true, env = "NOTECOG_VAULT_PATH")]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Expand a template into a prompt.
    Expand {
        #[command(flatten)]
        template: TemplateArgs,

        /// Selected text substituted for `{}`.
        #[arg(short, long)]
        selection: Option<String>,

        /// Path or title of the active note.
        #[arg(short, long)]
        active: Option<String>,
    },

    /// Manage prompt templates.
    Prompt {
        /// Prompt subcommand.
        #[command(subcommand)]
        action: PromptAction,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    if let Some(vault) = &cli.vault {
        config = config.with_vault_path(vault);
    }

    let logging = match LoggingConfig::from_settings(&config.logging, cli.verbose) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Invalid logging configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    if let Err(e) = observability::init_logging(logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let registry = PromptServiceRegistry::new();
    let notices = Arc::new(RecordingNotifier::new());
    let result = run_command(
        cli.command,
        &registry,
        &config,
        Arc::clone(&notices) as Arc<dyn Notifier>,
    )
    .await;

    for notice in notices.take() {
        eprintln!("Warning: {notice}");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(
    command: Commands,
    registry: &PromptServiceRegistry,
    config: &NotecogConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_prompt_service(registry, config, notifier).await?;

    match command {
        Commands::Expand {
            template,
            selection,
            active,
        } => cmd_expand(&service, template, selection, active).await,

        Commands::Prompt { action } => cmd_prompt(&service, action).await,
    }
}

/// Loads configuration.
fn load_config(path: Option<&Path>) -> Result<NotecogConfig, Box<dyn std::error::Error>> {
    // If a path is provided, load from that file
    if let Some(config_path) = path {
        return NotecogConfig::load_from_file(config_path).map_err(Into::into);
    }

    // Environment override for config path
    if let Ok(config_path) = std::env::var("NOTECOG_CONFIG_PATH")
        && !config_path.trim().is_empty()
    {
        return NotecogConfig::load_from_file(Path::new(&config_path)).map_err(Into::into);
    }

    // Otherwise, load from default location
    Ok(NotecogConfig::load_default())
}
