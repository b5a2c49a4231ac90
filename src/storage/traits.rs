//! Note repository trait definition.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::Result;
use crate::markdown::extract_section;
use crate::models::NoteHandle;

/// Read/write access to a hierarchical document store.
///
/// Paths are vault-relative with `/` separators. Listing order must be
/// stable for an unchanged store, since expansion output follows it.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Stable identity of the underlying store (e.g. its root path).
    fn id(&self) -> &str;

    /// Lists files, optionally restricted to a folder and an extension.
    ///
    /// # Arguments
    ///
    /// * `path_prefix` - Folder to list recursively (`None` lists the whole vault)
    /// * `extension` - Extension filter without the dot, compared ignoring case
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn list_files(
        &self,
        path_prefix: Option<&str>,
        extension: Option<&str>,
    ) -> Result<Vec<NoteHandle>>;

    /// Reads the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable.
    async fn read_file(&self, handle: &NoteHandle) -> Result<String>;

    /// Resolves an exact vault-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn resolve_by_path(&self, path: &str) -> Result<Option<NoteHandle>>;

    /// Resolves a note by display name (file stem).
    ///
    /// The title may also be a file name or an extension-less path. An exact
    /// match wins over a case-insensitive one; among equals, the first in
    /// listing order wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn resolve_by_title(&self, title: &str) -> Result<Option<NoteHandle>>;

    /// Finds every note carrying any of the tags, in listing order.
    ///
    /// A note that cannot be read is skipped, not treated as a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn find_by_tags(&self, tags: &BTreeSet<String>) -> Result<Vec<NoteHandle>>;

    /// Creates a folder and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be created.
    async fn create_folder(&self, path: &str) -> Result<()>;

    /// Returns true if a file or folder exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Creates a new file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if the path already exists, or an
    /// I/O error.
    async fn create_file(&self, path: &str, content: &str) -> Result<NoteHandle>;

    /// Replaces the content of an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be written.
    async fn modify_file(&self, handle: &NoteHandle, content: &str) -> Result<()>;

    /// Moves a file to `new_path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if `new_path` is taken, or an I/O
    /// error.
    async fn rename_file(&self, handle: &NoteHandle, new_path: &str) -> Result<NoteHandle>;

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be removed.
    async fn delete_file(&self, handle: &NoteHandle) -> Result<()>;

    /// Reads a file, optionally sliced to the section under `heading`.
    ///
    /// Returns `None` when the heading does not exist in the note.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    async fn read_section(
        &self,
        handle: &NoteHandle,
        heading: Option<&str>,
    ) -> Result<Option<String>> {
        let content = self.read_file(handle).await?;
        Ok(match heading {
            Some(heading) => extract_section(&content, heading),
            None => Some(content),
        })
    }
}

/// Picks the best title match from handles in listing order.
pub(crate) fn best_title_match<'a, I>(handles: I, title: &str) -> Option<NoteHandle>
where
    I: IntoIterator<Item = &'a NoteHandle>,
{
    let title = title.trim();
    let lowered = title.to_lowercase();
    let mut fallback = None;
    for handle in handles {
        if handle.basename() == title
            || handle.file_name() == title
            || handle.path_without_extension() == title
        {
            return Some(handle.clone());
        }
        if fallback.is_none() && handle.basename().to_lowercase() == lowered {
            fallback = Some(handle.clone());
        }
    }
    fallback
}
