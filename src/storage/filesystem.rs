//! Filesystem-backed note repository.
//!
//! Treats a directory as a vault: every file below it is a note addressed by
//! its `/`-separated path relative to the root. Dot-files and dot-folders
//! (`.obsidian`, `.git`, `.notecog`) are invisible.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::traits::{NoteRepository, best_title_match};
use crate::markdown::{extract_tags, tag_matches};
use crate::models::NoteHandle;
use crate::{Error, Result};

/// Extension of notes scanned for tags.
const NOTE_EXTENSION: &str = "md";

/// Filesystem-based note repository.
#[derive(Debug, Clone)]
pub struct FilesystemVault {
    /// Vault root directory.
    root: PathBuf,
    /// Identity derived from the root.
    id: String,
}

impl FilesystemVault {
    /// Opens a vault rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist or is not a directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::operation(
                "open_vault",
                format!("{} is not a directory", root.display()),
            ));
        }
        let root = root.canonicalize().unwrap_or(root);
        let id = format!("fs:{}", root.display());
        Ok(Self { root, id })
    }

    /// Returns the vault root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a vault-relative path onto the filesystem, rejecting escapes.
    fn absolute(&self, path: &str) -> Result<PathBuf> {
        let relative = NoteHandle::new(path.trim_end_matches('/'));
        let relative = Path::new(relative.path());
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::InvalidInput(format!(
                "path '{path}' escapes the vault"
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Converts an absolute path under the root into a handle.
    fn handle_for(&self, path: &Path) -> Option<NoteHandle> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        Some(NoteHandle::new(parts.join("/")))
    }

    /// Recursively collects files under `start`, sorted by path.
    async fn walk(&self, start: PathBuf) -> Result<Vec<NoteHandle>> {
        let mut handles = Vec::new();
        let mut pending = vec![start];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::operation("list_files", e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Error::operation("list_files", e))?
            {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| Error::operation("list_files", e))?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file()
                    && let Some(handle) = self.handle_for(&entry.path())
                {
                    handles.push(handle);
                }
            }
        }

        handles.sort();
        Ok(handles)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::operation("create_folder", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for FilesystemVault {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_files(
        &self,
        path_prefix: Option<&str>,
        extension: Option<&str>,
    ) -> Result<Vec<NoteHandle>> {
        let start = match path_prefix {
            Some(prefix) => self.absolute(prefix)?,
            None => self.root.clone(),
        };
        let handles = self.walk(start).await?;
        Ok(handles
            .into_iter()
            .filter(|h| extension.is_none_or(|ext| h.has_extension(ext)))
            .collect())
    }

    async fn read_file(&self, handle: &NoteHandle) -> Result<String> {
        let path = self.absolute(handle.path())?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::operation("read_note", format!("{}: {e}", handle.path())))
    }

    async fn resolve_by_path(&self, path: &str) -> Result<Option<NoteHandle>> {
        let absolute = self.absolute(path)?;
        match tokio::fs::metadata(&absolute).await {
            Ok(meta) if meta.is_file() => Ok(self.handle_for(&absolute)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::operation("resolve_by_path", e)),
        }
    }

    async fn resolve_by_title(&self, title: &str) -> Result<Option<NoteHandle>> {
        let handles = self.walk(self.root.clone()).await?;
        Ok(best_title_match(&handles, title))
    }

    async fn find_by_tags(&self, tags: &BTreeSet<String>) -> Result<Vec<NoteHandle>> {
        let notes = self.list_files(None, Some(NOTE_EXTENSION)).await?;
        let mut found = Vec::new();
        for handle in notes {
            let content = match self.read_file(&handle).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(
                        path = handle.path(),
                        error = %e,
                        "Skipping unreadable note during tag scan"
                    );
                    continue;
                },
            };
            let note_tags = extract_tags(&content);
            if note_tags
                .iter()
                .any(|nt| tags.iter().any(|query| tag_matches(nt, query)))
            {
                found.push(handle);
            }
        }
        Ok(found)
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        let absolute = self.absolute(path)?;
        tokio::fs::create_dir_all(&absolute)
            .await
            .map_err(|e| Error::operation("create_folder", e))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let absolute = self.absolute(path)?;
        tokio::fs::try_exists(&absolute)
            .await
            .map_err(|e| Error::operation("exists", e))
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<NoteHandle> {
        let absolute = self.absolute(path)?;
        self.ensure_parent(&absolute).await?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&absolute)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Conflict {
                    path: NoteHandle::new(path).path().to_string(),
                });
            },
            Err(e) => return Err(Error::operation("create_file", e)),
        };

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::operation("create_file", e))?;
        file.flush()
            .await
            .map_err(|e| Error::operation("create_file", e))?;

        Ok(NoteHandle::new(path))
    }

    async fn modify_file(&self, handle: &NoteHandle, content: &str) -> Result<()> {
        let absolute = self.absolute(handle.path())?;
        if !tokio::fs::try_exists(&absolute)
            .await
            .map_err(|e| Error::operation("modify_file", e))?
        {
            return Err(Error::operation(
                "modify_file",
                format!("no such note: {}", handle.path()),
            ));
        }
        tokio::fs::write(&absolute, content)
            .await
            .map_err(|e| Error::operation("modify_file", e))
    }

    async fn rename_file(&self, handle: &NoteHandle, new_path: &str) -> Result<NoteHandle> {
        let from = self.absolute(handle.path())?;
        let to = self.absolute(new_path)?;
        let target = NoteHandle::new(new_path);

        if from != to
            && tokio::fs::try_exists(&to)
                .await
                .map_err(|e| Error::operation("rename_file", e))?
        {
            return Err(Error::Conflict {
                path: target.path().to_string(),
            });
        }

        self.ensure_parent(&to).await?;
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| Error::operation("rename_file", e))?;
        Ok(target)
    }

    async fn delete_file(&self, handle: &NoteHandle) -> Result<()> {
        let absolute = self.absolute(handle.path())?;
        tokio::fs::remove_file(&absolute)
            .await
            .map_err(|e| Error::operation("delete_file", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, path: &str, content: &str) {
        let full = dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    fn vault_with_notes() -> (TempDir, FilesystemVault) {
        let dir = TempDir::new().unwrap();
        write(&dir, "Projects/Beta.md", "#project beta");
        write(&dir, "Projects/Alpha.md", "---\ntags: [project]\n---\nalpha");
        write(&dir, "Inbox.md", "#inbox");
        write(&dir, ".obsidian/workspace.json", "{}");
        write(&dir, "Files/diagram.png", "png");
        let vault = FilesystemVault::new(dir.path()).unwrap();
        (dir, vault)
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(FilesystemVault::new(dir.path().join("nope")).is_err());
    }

    #[tokio::test]
    async fn test_list_files_sorted_and_hides_dotfiles() {
        let (_dir, vault) = vault_with_notes();

        let all = vault.list_files(None, None).await.unwrap();
        let paths: Vec<_> = all.iter().map(NoteHandle::path).collect();
        assert_eq!(
            paths,
            vec![
                "Files/diagram.png",
                "Inbox.md",
                "Projects/Alpha.md",
                "Projects/Beta.md"
            ]
        );

        let projects = vault.list_files(Some("Projects"), Some("md")).await.unwrap();
        assert_eq!(projects.len(), 2);

        let none = vault.list_files(Some("Missing"), None).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let (_dir, vault) = vault_with_notes();
        let err = vault.read_file(&NoteHandle::new("../etc/passwd")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_find_by_tags() {
        let (_dir, vault) = vault_with_notes();
        let tags: BTreeSet<String> = std::iter::once("project".to_string()).collect();
        let found = vault.find_by_tags(&tags).await.unwrap();
        let paths: Vec<_> = found.iter().map(NoteHandle::path).collect();
        assert_eq!(paths, vec!["Projects/Alpha.md", "Projects/Beta.md"]);
    }

    #[tokio::test]
    async fn test_find_by_tags_skips_unreadable_notes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Good.md", "#work good body");
        std::fs::write(dir.path().join("Bad.md"), [0xff, 0xfe, 0x00, b'x']).unwrap();
        let vault = FilesystemVault::new(dir.path()).unwrap();

        let tags: BTreeSet<String> = std::iter::once("work".to_string()).collect();
        let found = vault.find_by_tags(&tags).await.unwrap();
        assert_eq!(found, vec![NoteHandle::new("Good.md")]);
    }

    #[tokio::test]
    async fn test_resolve() {
        let (_dir, vault) = vault_with_notes();
        let by_title = vault.resolve_by_title("alpha").await.unwrap().unwrap();
        assert_eq!(by_title.path(), "Projects/Alpha.md");

        let by_path = vault.resolve_by_path("Inbox.md").await.unwrap();
        assert!(by_path.is_some());
        assert!(vault.resolve_by_path("Projects").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_lifecycle() {
        let (_dir, vault) = vault_with_notes();

        let handle = vault.create_file("prompts/A.md", "one").await.unwrap();
        assert!(vault.exists("prompts").await.unwrap());

        let err = vault.create_file("prompts/A.md", "two").await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        vault.modify_file(&handle, "three").await.unwrap();
        assert_eq!(vault.read_file(&handle).await.unwrap(), "three");

        let renamed = vault.rename_file(&handle, "prompts/B.md").await.unwrap();
        assert!(!vault.exists("prompts/A.md").await.unwrap());

        vault.delete_file(&renamed).await.unwrap();
        assert!(!vault.exists("prompts/B.md").await.unwrap());
    }
}
