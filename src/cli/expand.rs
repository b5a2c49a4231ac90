//! The `expand` command.

#![allow(clippy::print_stdout)]

use std::io::{self, Read};

use super::CommandResult;
use crate::models::NoteHandle;
use crate::services::PromptService;
use crate::storage::NoteRepository;

/// Where the template to expand comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Template text given on the command line.
    Inline(String),
    /// A stored template, by title.
    Stored(String),
    /// Template text read from stdin.
    Stdin,
}

/// Arguments for the `expand` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandArgs {
    /// The template.
    pub source: TemplateSource,
    /// Selected text; empty for none.
    pub selection: String,
    /// Path or title of the active note.
    pub active: Option<String>,
}

/// Executes the `expand` subcommand, printing the prompt to stdout.
///
/// Running a stored template records its use.
///
/// # Errors
///
/// Returns an error if the stored template or the active note does not
/// exist, or stdin cannot be read.
pub async fn cmd_expand(service: &PromptService, args: &ExpandArgs) -> CommandResult {
    let active = match &args.active {
        Some(reference) => Some(resolve_active_note(service.repository().as_ref(), reference).await?),
        None => None,
    };

    let prompt = match &args.source {
        TemplateSource::Inline(template) => {
            service
                .expander()
                .expand(template, &args.selection, active.as_ref())
                .await
        },
        TemplateSource::Stored(title) => {
            service
                .expand_template(title, &args.selection, active.as_ref())
                .await?
        },
        TemplateSource::Stdin => {
            let mut template = String::new();
            io::stdin().read_to_string(&mut template)?;
            service
                .expander()
                .expand(&template, &args.selection, active.as_ref())
                .await
        },
    };

    println!("{prompt}");
    Ok(())
}

/// Finds the active note by exact path, then by title.
async fn resolve_active_note(
    repository: &dyn NoteRepository,
    reference: &str,
) -> Result<NoteHandle, Box<dyn std::error::Error>> {
    if let Some(handle) = repository.resolve_by_path(reference).await? {
        return Ok(handle);
    }
    repository
        .resolve_by_title(reference)
        .await?
        .ok_or_else(|| format!("Active note not found: {reference}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryVault;

    #[tokio::test]
    async fn test_resolve_active_note() {
        let vault = MemoryVault::new();
        vault.insert("Daily/Today.md", "today").unwrap();

        let by_path = resolve_active_note(&vault, "Daily/Today.md").await.unwrap();
        assert_eq!(by_path.path(), "Daily/Today.md");

        let by_title = resolve_active_note(&vault, "today").await.unwrap();
        assert_eq!(by_title.path(), "Daily/Today.md");

        assert!(resolve_active_note(&vault, "Tomorrow").await.is_err());
    }
}
