//! Note handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a document in a note repository.
///
/// The path is vault-relative and always uses `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteHandle {
    path: String,
}

impl NoteHandle {
    /// Creates a handle, normalizing separators and leading slashes.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        let path = path.replace('\\', "/");
        Self {
            path: path.trim_start_matches("./").trim_start_matches('/').to_string(),
        }
    }

    /// Returns the vault-relative path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the final path segment, including its extension.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Returns the file stem, which is the note's display name.
    #[must_use]
    pub fn basename(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }

    /// Returns the extension without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => Some(&name[dot + 1..]),
            _ => None,
        }
    }

    /// Returns the parent folder, or `None` for notes at the vault root.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.path.rfind('/').map(|slash| &self.path[..slash])
    }

    /// Returns the path with the extension stripped.
    #[must_use]
    pub fn path_without_extension(&self) -> &str {
        self.extension()
            .map_or(self.path.as_str(), |ext| {
                &self.path[..self.path.len() - ext.len() - 1]
            })
    }

    /// Returns true if the note lives in `folder` or one of its subfolders.
    #[must_use]
    pub fn is_under(&self, folder: &str) -> bool {
        let folder = folder.trim_matches('/');
        folder.is_empty()
            || self
                .path
                .strip_prefix(folder)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Returns true if the extension matches `ext`, ignoring case.
    #[must_use]
    pub fn has_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for NoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for NoteHandle {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
