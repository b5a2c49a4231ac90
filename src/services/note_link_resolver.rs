//! Resolution of `[[Note]]` and `[[Note#Heading]]` links.

use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use super::notifier::{Notice, Notifier};
use crate::models::{ContentBlock, NoteLinkReference, scan_note_links};
use crate::storage::NoteRepository;

/// Resolves note links against a repository.
///
/// A link to a note that does not exist, or to a heading the note lacks, is
/// silently omitted.
pub struct NoteLinkResolver {
    repository: Arc<dyn NoteRepository>,
    notifier: Arc<dyn Notifier>,
}

impl NoteLinkResolver {
    /// Creates a new resolver.
    #[must_use]
    pub fn new(repository: Arc<dyn NoteRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Resolves every distinct link in `template`, in order of first
    /// appearance.
    ///
    /// A link whose `[[...]]` text occurs inside any of `covered` (raw texts
    /// of variables that already produced content) is skipped.
    #[instrument(skip_all, fields(template_len = template.len()))]
    pub async fn resolve_note_links(
        &self,
        template: &str,
        covered: &[&str],
    ) -> Vec<ContentBlock> {
        let mut seen = HashSet::new();
        let mut blocks = Vec::new();

        for link in scan_note_links(template) {
            if !seen.insert(link.raw.clone()) {
                continue;
            }
            let label = link.label();
            if covered.iter().any(|raw| raw.contains(&label)) {
                tracing::debug!(link = %label, "Link already covered by a variable");
                counter!("prompt_note_links_resolved_total", "status" => "covered").increment(1);
                continue;
            }

            let status = match self.resolve_link(&link).await {
                Some(content) => {
                    blocks.push(ContentBlock::new(label, content));
                    "resolved"
                },
                None => "missing",
            };
            counter!("prompt_note_links_resolved_total", "status" => status).increment(1);
        }

        blocks
    }

    async fn resolve_link(&self, link: &NoteLinkReference) -> Option<String> {
        let handle = match self.repository.resolve_by_title(&link.title).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                tracing::debug!(title = %link.title, "Linked note not found");
                return None;
            },
            Err(e) => {
                tracing::warn!(title = %link.title, error = %e, "Note lookup failed");
                return None;
            },
        };

        match self
            .repository
            .read_section(&handle, link.heading.as_deref())
            .await
        {
            Ok(Some(content)) => Some(content),
            Ok(None) => {
                tracing::debug!(
                    title = %link.title,
                    heading = link.heading.as_deref().unwrap_or_default(),
                    "Linked heading not found"
                );
                None
            },
            Err(e) => {
                self.notifier.notify(&Notice::NoteReadFailed {
                    path: handle.path().to_string(),
                    cause: e.to_string(),
                });
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RecordingNotifier;
    use crate::storage::MemoryVault;

    fn resolver(vault: MemoryVault) -> (NoteLinkResolver, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver =
            NoteLinkResolver::new(Arc::new(vault), Arc::clone(&notifier) as Arc<dyn Notifier>);
        (resolver, notifier)
    }

    #[tokio::test]
    async fn test_missing_note_is_silent() {
        let (resolver, notifier) = resolver(MemoryVault::new());
        let blocks = resolver.resolve_note_links("See [[Nowhere]]", &[]).await;
        assert!(blocks.is_empty());
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_heading_does_not_leak_between_links() {
        let vault = MemoryVault::new();
        vault.insert("A.md", "# A\n## Intro\nintro\n## Body\nbody").unwrap();
        vault.insert("B.md", "## Intro\nb intro\n## Rest\nb rest").unwrap();
        let (resolver, _) = resolver(vault);

        let blocks = resolver
            .resolve_note_links("[[A#Intro]] then [[B]]", &[])
            .await;
        assert_eq!(
            blocks,
            vec![
                ContentBlock::new("[[A#Intro]]", "## Intro\nintro"),
                ContentBlock::new("[[B]]", "## Intro\nb intro\n## Rest\nb rest"),
            ]
        );
    }

    #[tokio::test]
    async fn test_covered_links_are_skipped() {
        let vault = MemoryVault::new();
        vault.insert("Note.md", "body").unwrap();
        let (resolver, _) = resolver(vault);

        let blocks = resolver
            .resolve_note_links("{[[Note]]} and [[Note]]", &["[[Note]]"])
            .await;
        assert!(blocks.is_empty());
    }

    #[tokio::test]
    async fn test_missing_heading_omits_block() {
        let vault = MemoryVault::new();
        vault.insert("Note.md", "## Present\ntext").unwrap();
        let (resolver, _) = resolver(vault);

        let blocks = resolver
            .resolve_note_links("[[Note#Absent]] [[Note#Absent]]", &[])
            .await;
        assert!(blocks.is_empty());
    }
}
