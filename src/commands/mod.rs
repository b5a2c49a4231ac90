//! Command handlers module.
//!
//! Maps parsed clap arguments onto the library's CLI functions:
//! - `expand.rs`: template expansion
//! - `prompt.rs`: prompt template management

mod expand;
mod prompt;

use std::path::PathBuf;

use clap::{Args, Subcommand};

pub use expand::cmd_expand;
pub use prompt::cmd_prompt;

/// Template options for `expand`.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct TemplateArgs {
    /// Template text to expand.
    #[arg(short, long)]
    pub template: Option<String>,

    /// Title of a stored template to expand.
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Read the template from stdin.
    #[arg(long)]
    pub stdin: bool,
}

/// Content options for `prompt save` and `prompt update`.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct ContentArgs {
    /// Template content.
    #[arg(long)]
    pub content: Option<String>,

    /// Read the content from a file.
    #[arg(short, long)]
    pub from_file: Option<PathBuf>,

    /// Read the content from stdin.
    #[arg(long)]
    pub stdin: bool,
}

/// Prompt subcommands.
#[derive(Subcommand)]
pub enum PromptAction {
    /// List stored templates, most recently used first.
    List {
        /// Output format: table or json.
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Print a stored template.
    Get {
        /// Template title.
        title: String,

        /// Output format: template, table, or json.
        #[arg(short, long, default_value = "template")]
        format: String,
    },

    /// Create a template.
    Save {
        /// Template title.
        title: String,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Replace a template's content, optionally renaming it.
    Update {
        /// Current template title.
        title: String,

        /// New title.
        #[arg(short, long)]
        rename: Option<String>,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Delete a template.
    Delete {
        /// Template title.
        title: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}
