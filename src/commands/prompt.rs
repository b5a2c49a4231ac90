//! Prompt command handler.
//!
//! Contains the implementation of the `prompt` CLI command for
//! managing prompt templates.

use notecog::PromptService;
use notecog::cli::{
    CommandResult, ContentSource, OutputFormat, cmd_prompt_delete, cmd_prompt_get,
    cmd_prompt_list, cmd_prompt_save, cmd_prompt_update,
};

use super::{ContentArgs, PromptAction};

/// Prompt command.
pub async fn cmd_prompt(service: &PromptService, action: PromptAction) -> CommandResult {
    match action {
        PromptAction::List { format } => cmd_prompt_list(service, OutputFormat::parse(&format)).await,

        PromptAction::Get { title, format } => {
            cmd_prompt_get(service, &title, OutputFormat::parse(&format)).await
        },

        PromptAction::Save { title, content } => {
            cmd_prompt_save(service, &title, &content_source(content)?).await
        },

        PromptAction::Update {
            title,
            rename,
            content,
        } => {
            cmd_prompt_update(service, &title, rename.as_deref(), &content_source(content)?).await
        },

        PromptAction::Delete { title, force } => cmd_prompt_delete(service, &title, force).await,
    }
}

fn content_source(args: ContentArgs) -> Result<ContentSource, Box<dyn std::error::Error>> {
    ContentSource::from_options(args.content, args.from_file, args.stdin)
}
