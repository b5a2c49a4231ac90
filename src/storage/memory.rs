//! In-memory note repository.
//!
//! Notes are listed in insertion order. Useful for tests and for hosts that
//! already hold their documents in memory.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::{NoteRepository, best_title_match};
use crate::markdown::{extract_tags, tag_matches};
use crate::models::NoteHandle;
use crate::{Error, Result};

static NEXT_VAULT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
struct MemoryNote {
    handle: NoteHandle,
    content: String,
}

#[derive(Debug, Default)]
struct VaultState {
    notes: Vec<MemoryNote>,
    folders: BTreeSet<String>,
}

impl VaultState {
    fn position(&self, path: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.handle.path() == path)
    }

    fn exists(&self, path: &str) -> bool {
        self.position(path).is_some()
            || self.folders.contains(path)
            || self.notes.iter().any(|n| n.handle.is_under(path))
    }
}

/// In-memory note repository.
#[derive(Debug)]
pub struct MemoryVault {
    id: String,
    state: RwLock<VaultState>,
}

impl MemoryVault {
    /// Creates an empty vault with a unique id.
    #[must_use]
    pub fn new() -> Self {
        let n = NEXT_VAULT_ID.fetch_add(1, Ordering::Relaxed);
        Self::with_id(format!("memory:{n}"))
    }

    /// Creates an empty vault with an explicit id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: RwLock::new(VaultState::default()),
        }
    }

    /// Inserts or replaces a note, returning its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn insert(&self, path: &str, content: impl Into<String>) -> Result<NoteHandle> {
        let handle = NoteHandle::new(path);
        let content = content.into();
        let mut state = self.write("insert_note")?;
        match state.position(handle.path()) {
            Some(index) => state.notes[index].content = content,
            None => state.notes.push(MemoryNote {
                handle: handle.clone(),
                content,
            }),
        }
        Ok(handle)
    }

    /// Returns the number of stored notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read("count_notes")?.notes.len())
    }

    /// Returns true if the vault holds no notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self, operation: &str) -> Result<RwLockReadGuard<'_, VaultState>> {
        self.state
            .read()
            .map_err(|_| Error::operation(operation, "Lock poisoned"))
    }

    fn write(&self, operation: &str) -> Result<RwLockWriteGuard<'_, VaultState>> {
        self.state
            .write()
            .map_err(|_| Error::operation(operation, "Lock poisoned"))
    }

    fn missing(operation: &str, path: &str) -> Error {
        Error::operation(operation, format!("no such note: {path}"))
    }
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteRepository for MemoryVault {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_files(
        &self,
        path_prefix: Option<&str>,
        extension: Option<&str>,
    ) -> Result<Vec<NoteHandle>> {
        let state = self.read("list_files")?;
        Ok(state
            .notes
            .iter()
            .map(|n| &n.handle)
            .filter(|h| path_prefix.is_none_or(|prefix| h.is_under(prefix)))
            .filter(|h| extension.is_none_or(|ext| h.has_extension(ext)))
            .cloned()
            .collect())
    }

    async fn read_file(&self, handle: &NoteHandle) -> Result<String> {
        let state = self.read("read_note")?;
        state
            .position(handle.path())
            .map(|index| state.notes[index].content.clone())
            .ok_or_else(|| Self::missing("read_note", handle.path()))
    }

    async fn resolve_by_path(&self, path: &str) -> Result<Option<NoteHandle>> {
        let wanted = NoteHandle::new(path);
        let state = self.read("resolve_by_path")?;
        Ok(state
            .position(wanted.path())
            .map(|index| state.notes[index].handle.clone()))
    }

    async fn resolve_by_title(&self, title: &str) -> Result<Option<NoteHandle>> {
        let state = self.read("resolve_by_title")?;
        Ok(best_title_match(state.notes.iter().map(|n| &n.handle), title))
    }

    async fn find_by_tags(&self, tags: &BTreeSet<String>) -> Result<Vec<NoteHandle>> {
        let state = self.read("find_by_tags")?;
        Ok(state
            .notes
            .iter()
            .filter(|note| {
                let note_tags = extract_tags(&note.content);
                note_tags
                    .iter()
                    .any(|nt| tags.iter().any(|query| tag_matches(nt, query)))
            })
            .map(|note| note.handle.clone())
            .collect())
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        let folder = NoteHandle::new(path.trim_end_matches('/'));
        let mut state = self.write("create_folder")?;
        let mut current = String::new();
        for segment in folder.path().split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            state.folders.insert(current.clone());
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let wanted = NoteHandle::new(path.trim_end_matches('/'));
        Ok(self.read("exists")?.exists(wanted.path()))
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<NoteHandle> {
        let handle = NoteHandle::new(path);
        let mut state = self.write("create_file")?;
        if state.exists(handle.path()) {
            return Err(Error::Conflict {
                path: handle.path().to_string(),
            });
        }
        state.notes.push(MemoryNote {
            handle: handle.clone(),
            content: content.to_string(),
        });
        Ok(handle)
    }

    async fn modify_file(&self, handle: &NoteHandle, content: &str) -> Result<()> {
        let mut state = self.write("modify_file")?;
        let index = state
            .position(handle.path())
            .ok_or_else(|| Self::missing("modify_file", handle.path()))?;
        state.notes[index].content = content.to_string();
        Ok(())
    }

    async fn rename_file(&self, handle: &NoteHandle, new_path: &str) -> Result<NoteHandle> {
        let target = NoteHandle::new(new_path);
        let mut state = self.write("rename_file")?;
        let index = state
            .position(handle.path())
            .ok_or_else(|| Self::missing("rename_file", handle.path()))?;
        if target.path() != handle.path() && state.exists(target.path()) {
            return Err(Error::Conflict {
                path: target.path().to_string(),
            });
        }
        state.notes[index].handle = target.clone();
        Ok(target)
    }

    async fn delete_file(&self, handle: &NoteHandle) -> Result<()> {
        let mut state = self.write("delete_file")?;
        let index = state
            .position(handle.path())
            .ok_or_else(|| Self::missing("delete_file", handle.path()))?;
        state.notes.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> MemoryVault {
        let vault = MemoryVault::new();
        vault.insert("Projects/Alpha.md", "#project alpha").unwrap();
        vault.insert("Projects/Beta.md", "---\ntags: [project/beta]\n---\nbeta").unwrap();
        vault.insert("Daily/2024-01-01.md", "#journal").unwrap();
        vault.insert("Daily/attachment.png", "binary").unwrap();
        vault
    }

    #[tokio::test]
    async fn test_list_files_filters() {
        let vault = vault();

        let all = vault.list_files(None, None).await.unwrap();
        assert_eq!(all.len(), 4);

        let daily_md = vault.list_files(Some("Daily"), Some("md")).await.unwrap();
        assert_eq!(daily_md, vec![NoteHandle::new("Daily/2024-01-01.md")]);
    }

    #[tokio::test]
    async fn test_resolve_by_title_prefers_exact_case() {
        let vault = MemoryVault::new();
        vault.insert("a/note.md", "lower").unwrap();
        vault.insert("b/Note.md", "upper").unwrap();

        let handle = vault.resolve_by_title("Note").await.unwrap().unwrap();
        assert_eq!(handle.path(), "b/Note.md");

        let handle = vault.resolve_by_title("NOTE").await.unwrap().unwrap();
        assert_eq!(handle.path(), "a/note.md");

        let handle = vault.resolve_by_title("b/Note").await.unwrap().unwrap();
        assert_eq!(handle.path(), "b/Note.md");

        assert!(vault.resolve_by_title("Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_tags_is_union_in_listing_order() {
        let vault = vault();
        let tags: BTreeSet<String> = ["journal", "project"].iter().map(ToString::to_string).collect();
        let found = vault.find_by_tags(&tags).await.unwrap();
        let paths: Vec<_> = found.iter().map(NoteHandle::path).collect();
        assert_eq!(
            paths,
            vec!["Projects/Alpha.md", "Projects/Beta.md", "Daily/2024-01-01.md"]
        );
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let vault = vault();
        let err = vault
            .create_file("Projects/Alpha.md", "again")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_folders_and_exists() {
        let vault = MemoryVault::new();
        assert!(!vault.exists("prompts").await.unwrap());
        vault.create_folder("prompts/nested/").await.unwrap();
        assert!(vault.exists("prompts").await.unwrap());
        assert!(vault.exists("prompts/nested").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_modify_delete() {
        let vault = vault();
        let handle = NoteHandle::new("Projects/Alpha.md");

        let renamed = vault.rename_file(&handle, "Projects/Gamma.md").await.unwrap();
        assert!(vault.resolve_by_path("Projects/Alpha.md").await.unwrap().is_none());

        vault.modify_file(&renamed, "gamma").await.unwrap();
        assert_eq!(vault.read_file(&renamed).await.unwrap(), "gamma");

        let err = vault
            .rename_file(&renamed, "Projects/Beta.md")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        vault.delete_file(&renamed).await.unwrap();
        assert!(vault.read_file(&renamed).await.is_err());
        assert_eq!(vault.len().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_read_section() {
        let vault = MemoryVault::new();
        let handle = vault.insert("A.md", "## One\n1\n## Two\n2").unwrap();

        let section = vault.read_section(&handle, Some("Two")).await.unwrap();
        assert_eq!(section.as_deref(), Some("## Two\n2"));

        let missing = vault.read_section(&handle, Some("Three")).await.unwrap();
        assert!(missing.is_none());

        let full = vault.read_section(&handle, None).await.unwrap();
        assert_eq!(full.as_deref(), Some("## One\n1\n## Two\n2"));
    }
}
