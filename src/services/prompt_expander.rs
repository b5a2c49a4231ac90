//! Prompt template expansion.
//!
//! Turns a template plus the user's selection and active note into the final
//! prompt string:
//!
//! ```text
//! <template with {} replaced by {selectedText}>
//!
//! selectedText:
//!
//!  <selection>
//!
//! <variable raw>:
//!
//! <variable content>
//!
//! [[<link>]]:
//!
//! <link content>
//! ```
//!
//! Blocks appear in order of first appearance within each group: selection,
//! then variables, then note links. Missing notes never fail an expansion.

use metrics::counter;
use std::sync::Arc;
use tracing::instrument;

use super::note_link_resolver::NoteLinkResolver;
use super::notifier::{Notice, Notifier, TracingNotifier};
use super::variable_resolver::VariableResolver;
use crate::config::ExpansionSettings;
use crate::models::{NoteHandle, SELECTION_PLACEHOLDER, VariableKind};
use crate::storage::NoteRepository;

/// Replacement for every `{}` in the working template.
const SELECTED_TEXT_MARKER: &str = "{selectedText}";

/// Expands prompt templates against a note repository.
///
/// Expansion only reads the repository. Dropping the future returned by
/// [`PromptExpander::expand`] abandons the expansion with no side effects, so
/// callers can bound it with `tokio::time::timeout` or `tokio::select!`.
pub struct PromptExpander {
    repository: Arc<dyn NoteRepository>,
    notifier: Arc<dyn Notifier>,
    variables: VariableResolver,
    note_links: NoteLinkResolver,
}

impl PromptExpander {
    /// Creates an expander that logs notices and uses default settings.
    #[must_use]
    pub fn new(repository: Arc<dyn NoteRepository>) -> Self {
        Self::with_parts(
            repository,
            Arc::new(TracingNotifier),
            ExpansionSettings::default(),
        )
    }

    /// Creates an expander with an explicit notifier and settings.
    #[must_use]
    pub fn with_parts(
        repository: Arc<dyn NoteRepository>,
        notifier: Arc<dyn Notifier>,
        settings: ExpansionSettings,
    ) -> Self {
        Self {
            variables: VariableResolver::new(
                Arc::clone(&repository),
                Arc::clone(&notifier),
                settings,
            ),
            note_links: NoteLinkResolver::new(Arc::clone(&repository), Arc::clone(&notifier)),
            repository,
            notifier,
        }
    }

    /// Expands `template` into a prompt.
    ///
    /// # Arguments
    ///
    /// * `template` - Template text with `{...}` and `[[...]]` references
    /// * `selected_text` - The user's current selection (may be empty)
    /// * `active_note` - The focused note, if any
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let prompt = expander.expand("Summarize {}", "hello world", None).await;
    /// assert_eq!(prompt, "Summarize {selectedText}\n\nselectedText:\n\n hello world");
    /// ```
    #[instrument(
        skip(self, template, selected_text, active_note),
        fields(template_len = template.len(), has_selection = !selected_text.is_empty())
    )]
    pub async fn expand(
        &self,
        template: &str,
        selected_text: &str,
        active_note: Option<&NoteHandle>,
    ) -> String {
        counter!("prompt_expansions_total").increment(1);

        let resolved = self
            .variables
            .resolve_variables(template, active_note)
            .await;

        let mut working = template.to_string();
        let mut additional = String::new();
        let mut active_note_included = false;

        if template.contains(SELECTION_PLACEHOLDER) {
            working = working.replace(SELECTION_PLACEHOLDER, SELECTED_TEXT_MARKER);
            active_note_included = self
                .push_selection(&mut additional, selected_text, active_note)
                .await;
        }

        for variable in &resolved {
            if variable.reference.kind == VariableKind::ActiveNote && active_note_included {
                continue;
            }
            additional.push_str(&format!(
                "\n\n{}:\n\n{}",
                variable.reference.raw, variable.block.content
            ));
        }

        let covered: Vec<&str> = resolved
            .iter()
            .map(|v| v.reference.raw.as_str())
            .collect();
        for block in self.note_links.resolve_note_links(&working, &covered).await {
            additional.push_str(&block.to_string());
        }

        tracing::debug!(
            variables = resolved.len(),
            output_len = working.len() + additional.len() + 2,
            "Expanded prompt template"
        );
        format!("{working}\n\n{additional}")
    }

    /// Appends the selection block; returns true if it carried the full
    /// active note.
    async fn push_selection(
        &self,
        additional: &mut String,
        selected_text: &str,
        active_note: Option<&NoteHandle>,
    ) -> bool {
        if !selected_text.is_empty() {
            additional.push_str(&format!("selectedText:\n\n {selected_text}"));
            return false;
        }

        if let Some(handle) = active_note {
            match self.repository.read_file(handle).await {
                Ok(content) => {
                    additional.push_str(&format!(
                        "selectedText (entire active note):\n\n {content}"
                    ));
                    return true;
                },
                Err(e) => self.notifier.notify(&Notice::NoteReadFailed {
                    path: handle.path().to_string(),
                    cause: e.to_string(),
                }),
            }
        }

        additional.push_str("selectedText:\n\n (No selected text or active note available)");
        false
    }
}
