//! Resolution of `{...}` variables.
//!
//! Each distinct variable resolves once, in order of first appearance, to at
//! most one [`ContentBlock`]. Notes matched by a tag or path variable are
//! read with bounded concurrency and merged in listing order.

use futures::stream::{self, StreamExt};
use metrics::counter;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::instrument;

use super::notifier::{Notice, Notifier};
use crate::config::ExpansionSettings;
use crate::markdown::{normalize_note_path, path_matches};
use crate::models::{ContentBlock, NoteHandle, VariableKind, VariableReference, scan_variables};
use crate::storage::NoteRepository;

/// Extension of notes eligible for tag and path variables.
const NOTE_EXTENSION: &str = "md";

/// A variable that produced content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariable {
    /// The variable as found in the template.
    pub reference: VariableReference,
    /// Its content.
    pub block: ContentBlock,
}

/// Resolves `{...}` variables against a repository.
pub struct VariableResolver {
    repository: Arc<dyn NoteRepository>,
    notifier: Arc<dyn Notifier>,
    settings: ExpansionSettings,
}

impl VariableResolver {
    /// Creates a new resolver.
    #[must_use]
    pub fn new(
        repository: Arc<dyn NoteRepository>,
        notifier: Arc<dyn Notifier>,
        settings: ExpansionSettings,
    ) -> Self {
        Self {
            repository,
            notifier,
            settings,
        }
    }

    /// Resolves every distinct non-selection variable in `template`.
    ///
    /// Variables that produce nothing raise a [`Notice`] and are left out of
    /// the result. The `{}` placeholder is not handled here.
    #[instrument(skip(self, template, active_note), fields(template_len = template.len()))]
    pub async fn resolve_variables(
        &self,
        template: &str,
        active_note: Option<&NoteHandle>,
    ) -> Vec<ResolvedVariable> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for reference in scan_variables(template) {
            if reference.kind == VariableKind::LiteralSelection
                || !seen.insert(reference.raw.clone())
            {
                continue;
            }

            match self.resolve_one(&reference, active_note).await {
                Some(block) => {
                    counter!(
                        "prompt_variables_resolved_total",
                        "kind" => reference.kind.as_str()
                    )
                    .increment(1);
                    resolved.push(ResolvedVariable { reference, block });
                },
                None => {
                    counter!(
                        "prompt_variables_unresolved_total",
                        "kind" => reference.kind.as_str()
                    )
                    .increment(1);
                },
            }
        }

        tracing::debug!(resolved = resolved.len(), "Resolved template variables");
        resolved
    }

    async fn resolve_one(
        &self,
        reference: &VariableReference,
        active_note: Option<&NoteHandle>,
    ) -> Option<ContentBlock> {
        match &reference.kind {
            VariableKind::LiteralSelection => None,
            VariableKind::ActiveNote => self.resolve_active_note(reference, active_note).await,
            VariableKind::TagSet(tags) => self.resolve_tags(reference, tags).await,
            VariableKind::PathPattern(pattern) => self.resolve_path(reference, pattern).await,
        }
    }

    async fn resolve_active_note(
        &self,
        reference: &VariableReference,
        active_note: Option<&NoteHandle>,
    ) -> Option<ContentBlock> {
        let Some(handle) = active_note else {
            self.notifier.notify(&Notice::NoActiveNote {
                variable: reference.raw.clone(),
            });
            return None;
        };

        match self.repository.read_file(handle).await {
            Ok(content) => Some(ContentBlock::new(handle.basename(), content)),
            Err(e) => {
                self.notify_read_failed(handle, &e);
                None
            },
        }
    }

    async fn resolve_tags(
        &self,
        reference: &VariableReference,
        tags: &BTreeSet<String>,
    ) -> Option<ContentBlock> {
        let handles = if tags.is_empty() {
            Vec::new()
        } else {
            self.repository
                .find_by_tags(tags)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(variable = %reference.raw, error = %e, "Tag lookup failed");
                    Vec::new()
                })
        };
        self.merge_or_notify(reference, handles).await
    }

    async fn resolve_path(
        &self,
        reference: &VariableReference,
        pattern: &str,
    ) -> Option<ContentBlock> {
        let pattern = normalize_note_path(pattern);
        let handles = match self.repository.list_files(None, Some(NOTE_EXTENSION)).await {
            Ok(handles) => handles
                .into_iter()
                .filter(|h| path_matches(h, &pattern))
                .collect(),
            Err(e) => {
                tracing::warn!(variable = %reference.raw, error = %e, "Note listing failed");
                Vec::new()
            },
        };
        self.merge_or_notify(reference, handles).await
    }

    async fn merge_or_notify(
        &self,
        reference: &VariableReference,
        handles: Vec<NoteHandle>,
    ) -> Option<ContentBlock> {
        let merged = self.read_merged(handles).await;
        if merged.is_none() {
            self.notifier.notify(&Notice::UnresolvedVariable {
                variable: reference.raw.clone(),
            });
        }
        merged.map(|content| ContentBlock::new(reference.raw.clone(), content))
    }

    /// Reads notes concurrently and joins them as `## <basename>` sections.
    ///
    /// Output follows the input order regardless of completion order.
    async fn read_merged(&self, handles: Vec<NoteHandle>) -> Option<String> {
        let repository = self.repository.as_ref();
        let results: Vec<_> = stream::iter(handles)
            .map(move |handle| async move {
                let content = repository.read_file(&handle).await;
                (handle, content)
            })
            .buffered(self.settings.fetch_concurrency.max(1))
            .collect()
            .await;

        let mut sections = Vec::with_capacity(results.len());
        for (handle, content) in results {
            match content {
                Ok(content) => sections.push(format!("## {}\n\n{content}", handle.basename())),
                Err(e) => self.notify_read_failed(&handle, &e),
            }
        }

        (!sections.is_empty()).then(|| sections.join("\n\n"))
    }

    fn notify_read_failed(&self, handle: &NoteHandle, error: &crate::Error) {
        self.notifier.notify(&Notice::NoteReadFailed {
            path: handle.path().to_string(),
            cause: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RecordingNotifier;
    use crate::storage::MemoryVault;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn resolver(vault: MemoryVault) -> (VariableResolver, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let resolver = VariableResolver::new(
            Arc::new(vault),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            ExpansionSettings::default().with_fetch_concurrency(2),
        );
        (resolver, notifier)
    }

    #[tokio::test]
    async fn test_tag_variable_merges_in_listing_order() {
        let vault = MemoryVault::new();
        vault.insert("B.md", "#x bee").unwrap();
        vault.insert("A.md", "#y ay").unwrap();
        vault.insert("C.md", "no tags").unwrap();
        let (resolver, notifier) = resolver(vault);

        let resolved = resolver.resolve_variables("{#x,#y}", None).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].block.label, "#x,#y");
        assert_eq!(resolved[0].block.content, "## B\n\n#x bee\n\n## A\n\n#y ay");
        assert!(notifier.notices().is_empty());
    }

    /// Vault whose reads take longer the earlier the note was inserted, and
    /// which records the peak number of reads in flight.
    struct SlowVault {
        inner: MemoryVault,
        delays: HashMap<String, u64>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowVault {
        fn new(notes: &[(&str, &str, u64)]) -> Self {
            let inner = MemoryVault::new();
            let mut delays = HashMap::new();
            for (path, content, delay_ms) in notes {
                inner.insert(path, *content).unwrap();
                delays.insert((*path).to_string(), *delay_ms);
            }
            Self {
                inner,
                delays,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NoteRepository for SlowVault {
        fn id(&self) -> &str {
            self.inner.id()
        }

        async fn list_files(
            &self,
            path_prefix: Option<&str>,
            extension: Option<&str>,
        ) -> crate::Result<Vec<NoteHandle>> {
            self.inner.list_files(path_prefix, extension).await
        }

        async fn read_file(&self, handle: &NoteHandle) -> crate::Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = self.delays.get(handle.path()).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.read_file(handle).await
        }

        async fn resolve_by_path(&self, path: &str) -> crate::Result<Option<NoteHandle>> {
            self.inner.resolve_by_path(path).await
        }

        async fn resolve_by_title(&self, title: &str) -> crate::Result<Option<NoteHandle>> {
            self.inner.resolve_by_title(title).await
        }

        async fn find_by_tags(&self, tags: &BTreeSet<String>) -> crate::Result<Vec<NoteHandle>> {
            self.inner.find_by_tags(tags).await
        }

        async fn create_folder(&self, path: &str) -> crate::Result<()> {
            self.inner.create_folder(path).await
        }

        async fn exists(&self, path: &str) -> crate::Result<bool> {
            self.inner.exists(path).await
        }

        async fn create_file(&self, path: &str, content: &str) -> crate::Result<NoteHandle> {
            self.inner.create_file(path, content).await
        }

        async fn modify_file(&self, handle: &NoteHandle, content: &str) -> crate::Result<()> {
            self.inner.modify_file(handle, content).await
        }

        async fn rename_file(
            &self,
            handle: &NoteHandle,
            new_path: &str,
        ) -> crate::Result<NoteHandle> {
            self.inner.rename_file(handle, new_path).await
        }

        async fn delete_file(&self, handle: &NoteHandle) -> crate::Result<()> {
            self.inner.delete_file(handle).await
        }
    }

    #[tokio::test]
    async fn test_bounded_reads_keep_listing_order() {
        let vault = Arc::new(SlowVault::new(&[
            ("Log/One.md", "one", 80),
            ("Log/Two.md", "two", 60),
            ("Log/Three.md", "three", 40),
            ("Log/Four.md", "four", 20),
            ("Log/Five.md", "five", 0),
        ]));
        let resolver = VariableResolver::new(
            Arc::clone(&vault) as Arc<dyn NoteRepository>,
            Arc::new(RecordingNotifier::new()),
            ExpansionSettings::default().with_fetch_concurrency(2),
        );

        let resolved = resolver.resolve_variables("{Log}", None).await;
        assert_eq!(
            resolved[0].block.content,
            "## One\n\none\n\n## Two\n\ntwo\n\n## Three\n\nthree\n\n## Four\n\nfour\n\n## Five\n\nfive"
        );
        assert_eq!(vault.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_path_variable_normalizes_pattern() {
        let vault = MemoryVault::new();
        vault.insert("Projects/Alpha.md", "alpha").unwrap();
        vault.insert("Projects/logo.png", "binary").unwrap();
        vault.insert("Other.md", "other").unwrap();
        let (resolver, _) = resolver(vault);

        let resolved = resolver.resolve_variables(r"{.\Projects\}", None).await;
        assert_eq!(resolved[0].block.content, "## Alpha\n\nalpha");
    }

    #[tokio::test]
    async fn test_duplicates_resolve_once() {
        let vault = MemoryVault::new();
        vault.insert("Note.md", "body").unwrap();
        let (resolver, _) = resolver(vault);

        let resolved = resolver.resolve_variables("{Note} and {Note} {}", None).await;
        assert_eq!(resolved.len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_variables_notify() {
        let (resolver, notifier) = resolver(MemoryVault::new());

        let resolved = resolver
            .resolve_variables("{activeNote} {#none} {Missing} {#}", None)
            .await;
        assert!(resolved.is_empty());
        assert_eq!(
            notifier.notices(),
            vec![
                Notice::NoActiveNote {
                    variable: "activeNote".to_string()
                },
                Notice::UnresolvedVariable {
                    variable: "#none".to_string()
                },
                Notice::UnresolvedVariable {
                    variable: "Missing".to_string()
                },
                Notice::UnresolvedVariable {
                    variable: "#".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_active_note_block() {
        let vault = MemoryVault::new();
        let handle = vault.insert("Daily/Today.md", "today").unwrap();
        let (resolver, _) = resolver(vault);

        let resolved = resolver
            .resolve_variables("{ACTIVENOTE}", Some(&handle))
            .await;
        assert_eq!(resolved[0].block, ContentBlock::new("Today", "today"));
    }

    #[tokio::test]
    async fn test_unreadable_active_note_notifies() {
        let (resolver, notifier) = resolver(MemoryVault::new());
        let ghost = NoteHandle::new("Ghost.md");

        let resolved = resolver.resolve_variables("{activeNote}", Some(&ghost)).await;
        assert!(resolved.is_empty());
        assert!(matches!(
            notifier.notices().as_slice(),
            [Notice::NoteReadFailed { path, .. }] if path == "Ghost.md"
        ));
    }
}
