//! CLI command implementations.
//!
//! The binary parses arguments with clap and calls into these functions.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `expand` | Expand a template (inline, stored, or from stdin) |
//! | `prompt list` | List stored templates, most recently used first |
//! | `prompt get` | Print a stored template |
//! | `prompt save` | Create a template |
//! | `prompt update` | Change a template's content and optionally rename it |
//! | `prompt delete` | Delete a template |
//!
//! # Example Usage
//!
//! ```bash
//! # Expand an inline template against the vault in the current directory
//! notecog expand --template "Summarize {#meeting}" --selection "notes"
//!
//! # Save and run a stored template
//! notecog prompt save Summarize --content "Summarize {}"
//! notecog expand --prompt Summarize --active Daily/Today.md
//! ```

mod expand;
mod prompt;

use std::sync::Arc;

pub use expand::{ExpandArgs, TemplateSource, cmd_expand};
pub use prompt::{
    ContentSource, OutputFormat, cmd_prompt_delete, cmd_prompt_get, cmd_prompt_list,
    cmd_prompt_save, cmd_prompt_update, render_prompt_table,
};

use crate::Result;
use crate::config::NotecogConfig;
use crate::services::{Notifier, PromptExpander, PromptService, PromptServiceRegistry};
use crate::storage::{FilesystemVault, NoteRepository, UsageTracker};

/// Result type of CLI commands.
pub type CommandResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Opens the prompt service for the configured vault.
///
/// Usage records are loaded from the configured usage file and notices are
/// delivered to `notifier`. A service already in `registry` for the same
/// vault is reused.
///
/// # Errors
///
/// Returns an error if the vault root is not a directory or the usage file
/// cannot be read.
pub async fn open_prompt_service(
    registry: &PromptServiceRegistry,
    config: &NotecogConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<Arc<PromptService>> {
    let vault: Arc<dyn NoteRepository> = Arc::new(FilesystemVault::new(&config.vault_path)?);
    let usage = Arc::new(UsageTracker::load(config.effective_usage_file()).await?);
    let expander = PromptExpander::with_parts(Arc::clone(&vault), notifier, config.expansion);

    tracing::debug!(
        vault = vault.id(),
        folder = %config.prompts.folder,
        "Opening prompt service"
    );
    registry.get_or_insert_with(vault.id(), || {
        PromptService::new(Arc::clone(&vault), config.prompts.clone())
            .with_usage_tracker(usage)
            .with_expander(expander)
    })
}
