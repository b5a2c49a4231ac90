//! Prompt template storage and management service.
//!
//! Templates are plain documents in a configured vault folder. The file stem
//! is the title and the body is the template text:
//!
//! ```text
//! copilot-custom-prompts/
//!   Summarize.md        -> "Summarize {}"
//!   Weekly Review.md    -> "Review {#journal} and [[Goals]]"
//! ```
//!
//! Listings are ranked by last use, most recent first.

use metrics::counter;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

use super::prompt_expander::PromptExpander;
use crate::config::PromptSettings;
use crate::models::{NoteHandle, PromptTemplate};
use crate::storage::{NoteRepository, UsageTracker};
use crate::{Error, Result};

/// Characters a title cannot contain: path separators and link syntax.
const FORBIDDEN_TITLE_CHARS: &[char] = &['/', '\\', '[', ']', '#', '|', '^', ':'];

/// Service for prompt template CRUD, usage tracking and expansion.
pub struct PromptService {
    repository: Arc<dyn NoteRepository>,
    settings: PromptSettings,
    usage: Arc<UsageTracker>,
    expander: PromptExpander,
}

impl PromptService {
    /// Creates a service with in-memory usage tracking and a default expander.
    #[must_use]
    pub fn new(repository: Arc<dyn NoteRepository>, settings: PromptSettings) -> Self {
        Self {
            expander: PromptExpander::new(Arc::clone(&repository)),
            repository,
            settings,
            usage: Arc::new(UsageTracker::in_memory()),
        }
    }

    /// Uses a shared usage tracker.
    #[must_use]
    pub fn with_usage_tracker(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    /// Uses a custom expander.
    #[must_use]
    pub fn with_expander(mut self, expander: PromptExpander) -> Self {
        self.expander = expander;
        self
    }

    /// Returns the folder settings.
    #[must_use]
    pub const fn settings(&self) -> &PromptSettings {
        &self.settings
    }

    /// Returns the repository.
    #[must_use]
    pub const fn repository(&self) -> &Arc<dyn NoteRepository> {
        &self.repository
    }

    /// Returns the usage tracker.
    #[must_use]
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Returns the expander.
    #[must_use]
    pub const fn expander(&self) -> &PromptExpander {
        &self.expander
    }

    /// Lists all templates, most recently used first.
    ///
    /// Templates never used keep listing order. Usage records for templates
    /// that no longer exist are pruned.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be listed or a template read.
    #[instrument(skip(self), fields(folder = %self.settings.folder))]
    pub async fn list(&self) -> Result<Vec<PromptTemplate>> {
        let handles = self.template_handles().await?;

        let mut ranked = Vec::with_capacity(handles.len());
        for handle in handles {
            let content = self.repository.read_file(&handle).await?;
            let template = PromptTemplate::new(handle.basename(), content);
            let score = self.usage.score(&template.title).await;
            ranked.push((score, template));
        }
        ranked.sort_by_key(|(score, _)| Reverse(*score));

        let titles: BTreeSet<String> = ranked.iter().map(|(_, t)| t.title.clone()).collect();
        self.usage.prune(&titles).await?;

        counter!("prompt_store_operations_total", "operation" => "list").increment(1);
        Ok(ranked.into_iter().map(|(_, t)| t).collect())
    }

    /// Gets a template by title.
    ///
    /// # Errors
    ///
    /// Returns an error if the template exists but cannot be read.
    #[instrument(skip(self))]
    pub async fn get(&self, title: &str) -> Result<Option<PromptTemplate>> {
        let Some(handle) = self.handle_for(title).await? else {
            return Ok(None);
        };
        let content = self.repository.read_file(&handle).await?;
        counter!("prompt_store_operations_total", "operation" => "get").increment(1);
        Ok(Some(PromptTemplate::new(title, content)))
    }

    /// Creates a new template, creating the folder if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an invalid title,
    /// [`Error::Conflict`] if the template already exists, or an I/O error.
    #[instrument(skip(self, content))]
    pub async fn create(&self, title: &str, content: &str) -> Result<PromptTemplate> {
        validate_title(title)?;
        let path = self.settings.path_for(title);
        if self.repository.exists(&path).await? {
            return Err(Error::Conflict { path });
        }

        if !self.settings.folder.is_empty()
            && !self.repository.exists(&self.settings.folder).await?
        {
            self.repository.create_folder(&self.settings.folder).await?;
        }
        self.repository.create_file(&path, content).await?;

        tracing::info!(title, path = %path, "Created prompt template");
        counter!("prompt_store_operations_total", "operation" => "create").increment(1);
        Ok(PromptTemplate::new(title, content))
    }

    /// Updates a template's content and optionally renames it.
    ///
    /// The usage record follows a rename.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `old_title` does not exist,
    /// [`Error::DuplicateTitle`] if `new_title` is taken (nothing is
    /// modified), [`Error::InvalidInput`] for an invalid new title, or an
    /// I/O error.
    #[instrument(skip(self, content))]
    pub async fn update(
        &self,
        old_title: &str,
        new_title: &str,
        content: &str,
    ) -> Result<PromptTemplate> {
        validate_title(new_title)?;
        let handle = self
            .handle_for(old_title)
            .await?
            .ok_or_else(|| Error::NotFound(format!("prompt '{old_title}'")))?;

        let handle = if old_title == new_title {
            handle
        } else {
            let new_path = self.settings.path_for(new_title);
            if self.repository.exists(&new_path).await? {
                return Err(Error::DuplicateTitle {
                    title: new_title.to_string(),
                });
            }
            let (renamed, ()) = tokio::try_join!(
                self.repository.rename_file(&handle, &new_path),
                self.usage.rename(old_title, new_title),
            )?;
            renamed
        };

        self.repository.modify_file(&handle, content).await?;

        tracing::info!(old_title, new_title, "Updated prompt template");
        counter!("prompt_store_operations_total", "operation" => "update").increment(1);
        Ok(PromptTemplate::new(new_title, content))
    }

    /// Deletes a template and its usage record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist, or an I/O
    /// error.
    #[instrument(skip(self))]
    pub async fn delete(&self, title: &str) -> Result<()> {
        let handle = self
            .handle_for(title)
            .await?
            .ok_or_else(|| Error::NotFound(format!("prompt '{title}'")))?;

        tokio::try_join!(
            self.repository.delete_file(&handle),
            self.usage.remove(title),
        )?;

        tracing::info!(title, "Deleted prompt template");
        counter!("prompt_store_operations_total", "operation" => "delete").increment(1);
        Ok(())
    }

    /// Marks a template as used now.
    ///
    /// # Errors
    ///
    /// Returns an error if the usage records cannot be persisted.
    pub async fn record_usage(&self, title: &str) -> Result<()> {
        self.usage.touch(title).await?;
        Ok(())
    }

    /// Loads a template, records its use, and expands it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist, or an I/O
    /// error while loading it or recording usage. Problems during expansion
    /// itself only produce notices.
    #[instrument(skip(self, selected_text, active_note))]
    pub async fn expand_template(
        &self,
        title: &str,
        selected_text: &str,
        active_note: Option<&NoteHandle>,
    ) -> Result<String> {
        let template = self
            .get(title)
            .await?
            .ok_or_else(|| Error::NotFound(format!("prompt '{title}'")))?;
        self.record_usage(title).await?;
        Ok(self
            .expander
            .expand(&template.content, selected_text, active_note)
            .await)
    }

    /// Template documents directly inside the folder, in listing order.
    async fn template_handles(&self) -> Result<Vec<NoteHandle>> {
        let folder = self.settings.folder.as_str();
        let prefix = (!folder.is_empty()).then_some(folder);
        let handles = self
            .repository
            .list_files(prefix, Some(&self.settings.extension))
            .await?;
        Ok(handles
            .into_iter()
            .filter(|h| h.parent().unwrap_or_default() == folder)
            .collect())
    }

    async fn handle_for(&self, title: &str) -> Result<Option<NoteHandle>> {
        if title.trim().is_empty() {
            return Ok(None);
        }
        self.repository
            .resolve_by_path(&self.settings.path_for(title))
            .await
    }
}

/// Validates a template title.
///
/// Titles become file names and `[[...]]` targets, so they cannot be empty,
/// start with a dot, or contain path separators or link syntax.
///
/// Examples of valid titles: `Summarize`, `Weekly Review`, `fix-grammar (v2)`
fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Prompt title cannot be empty. Use a title like 'Summarize' or 'Weekly Review'."
                .to_string(),
        ));
    }

    if title.trim() != title {
        return Err(Error::InvalidInput(format!(
            "Prompt title cannot start or end with whitespace: '{title}'."
        )));
    }

    if title.starts_with('.') {
        return Err(Error::InvalidInput(format!(
            "Prompt title cannot start with a dot: '{title}'. Hidden files are not listed."
        )));
    }

    if let Some(ch) = title.chars().find(|c| FORBIDDEN_TITLE_CHARS.contains(c)) {
        return Err(Error::InvalidInput(format!(
            "Invalid character '{ch}' in prompt title '{title}'. \
             Titles cannot contain any of / \\ [ ] # | ^ :"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryVault;
    use test_case::test_case;

    fn service() -> (Arc<MemoryVault>, PromptService) {
        let vault = Arc::new(MemoryVault::new());
        let service = PromptService::new(
            Arc::clone(&vault) as Arc<dyn NoteRepository>,
            PromptSettings::default().with_folder("prompts"),
        );
        (vault, service)
    }

    #[test_case("Summarize" ; "single word")]
    #[test_case("Weekly Review" ; "spaces")]
    #[test_case("fix-grammar (v2)" ; "punctuation")]
    fn test_validate_title_valid(title: &str) {
        assert!(validate_title(title).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    #[test_case(" padded" ; "leading space")]
    #[test_case(".hidden" ; "leading dot")]
    #[test_case("a/b" ; "slash")]
    #[test_case("a\\b" ; "backslash")]
    #[test_case("[[a]]" ; "brackets")]
    #[test_case("a#b" ; "hash")]
    #[test_case("a|b" ; "pipe")]
    #[test_case("a:b" ; "colon")]
    fn test_validate_title_invalid(title: &str) {
        assert!(matches!(validate_title(title), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (vault, service) = service();
        service.create("Summarize", "Summarize {}").await.unwrap();

        assert!(vault.exists("prompts").await.unwrap());
        let template = service.get("Summarize").await.unwrap().unwrap();
        assert_eq!(template, PromptTemplate::new("Summarize", "Summarize {}"));
        assert!(service.get("Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let (_, service) = service();
        service.create("A", "one").await.unwrap();
        let err = service.create("A", "two").await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_list_ranks_by_usage_and_ignores_nested() {
        let (vault, service) = service();
        service.create("First", "1").await.unwrap();
        service.create("Second", "2").await.unwrap();
        service.create("Third", "3").await.unwrap();
        vault.insert("prompts/archive/Old.md", "old").unwrap();
        vault.insert("prompts/notes.txt", "not a prompt").unwrap();

        service.usage().record("Third", 200).await.unwrap();
        service.usage().record("Second", 100).await.unwrap();
        service.usage().record("Deleted", 300).await.unwrap();

        let titles: Vec<_> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);
        assert_eq!(service.usage().score("Deleted").await, 0);
    }

    #[tokio::test]
    async fn test_update_renames_and_moves_usage() {
        let (_, service) = service();
        service.create("Old", "old body").await.unwrap();
        service.usage().record("Old", 42).await.unwrap();

        let updated = service.update("Old", "New", "new body").await.unwrap();
        assert_eq!(updated.title, "New");
        assert!(service.get("Old").await.unwrap().is_none());
        assert_eq!(
            service.get("New").await.unwrap().unwrap().content,
            "new body"
        );
        assert_eq!(service.usage().score("New").await, 42);
    }

    #[tokio::test]
    async fn test_update_onto_existing_title_changes_nothing() {
        let (_, service) = service();
        service.create("A", "a").await.unwrap();
        service.create("B", "b").await.unwrap();

        let err = service.update("A", "B", "changed").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateTitle { .. }));
        assert_eq!(service.get("A").await.unwrap().unwrap().content, "a");
        assert_eq!(service.get("B").await.unwrap().unwrap().content, "b");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let (_, service) = service();
        assert!(matches!(
            service.update("Ghost", "Ghost", "x").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.delete("Ghost").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_usage() {
        let (_, service) = service();
        service.create("A", "a").await.unwrap();
        service.record_usage("A").await.unwrap();

        service.delete("A").await.unwrap();
        assert!(service.get("A").await.unwrap().is_none());
        assert_eq!(service.usage().score("A").await, 0);
    }

    #[tokio::test]
    async fn test_expand_template_records_usage() {
        let (_, service) = service();
        service.create("Fix", "Fix {}").await.unwrap();

        let prompt = service.expand_template("Fix", "teh", None).await.unwrap();
        assert_eq!(prompt, "Fix {selectedText}\n\nselectedText:\n\n teh");
        assert!(service.usage().score("Fix").await > 0);

        assert!(matches!(
            service.expand_template("Ghost", "", None).await,
            Err(Error::NotFound(_))
        ));
    }
}
