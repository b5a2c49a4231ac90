//! # Notecog
//!
//! Prompt template expansion for AI assistants embedded in a note vault.
//!
//! Notecog takes a stored prompt template containing `{...}` variable
//! references and `[[note title]]` links, resolves every reference against a
//! note repository, and assembles one deterministic prompt string.
//!
//! ## Features
//!
//! - `{}` selection placeholder, `{activeNote}`, `{#tag1,#tag2}` and
//!   `{path/to/folder}` variables
//! - `[[Note]]` and `[[Note#Heading]]` links with heading-scoped slicing
//! - Soft failure for missing notes, surfaced through a [`services::Notifier`]
//! - Template CRUD with usage-based ranking
//! - Pluggable repositories ([`storage::FilesystemVault`], [`storage::MemoryVault`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use notecog::services::PromptExpander;
//! use notecog::storage::MemoryVault;
//!
//! let vault = Arc::new(MemoryVault::new());
//! vault.insert("Daily/Today.md", "Ship the release.");
//! let expander = PromptExpander::new(vault);
//! let prompt = expander.expand("Summarize {}", "some text", None).await;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

/// Creates a compile-time verified regex wrapped in [`std::sync::LazyLock`].
///
/// Declared ahead of the modules so every one of them can use it.
macro_rules! lazy_regex {
    ($pattern:expr) => {
        ::std::sync::LazyLock::new(|| {
            ::regex::Regex::new($pattern).unwrap_or_else(|_| unreachable!())
        })
    };
}

// Module declarations
pub mod cli;
pub mod config;
pub mod markdown;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{ExpansionSettings, NotecogConfig, PromptSettings};
pub use models::{ContentBlock, NoteHandle, NoteLinkReference, PromptTemplate, VariableKind};
pub use services::{
    Notice, Notifier, PromptExpander, PromptService, PromptServiceRegistry, RecordingNotifier,
    TracingNotifier,
};
pub use storage::{FilesystemVault, MemoryVault, NoteRepository, UsageTracker};

/// Error type for notecog operations.
///
/// Resolution-time problems (a variable that matches no note, a link to a
/// missing note) are never errors; they surface as [`services::Notice`]s.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty or ill-formed template titles, bad configuration values |
/// | `OperationFailed` | Repository I/O fails, serialization fails, a lock is poisoned |
/// | `Conflict` | Creating a document at a path that already exists |
/// | `DuplicateTitle` | Renaming a template onto an existing title |
/// | `NotFound` | Updating, deleting or running a template that does not exist |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A repository or filesystem operation failed.
    ///
    /// Raised when:
    /// - Reading, writing, renaming or deleting a note fails
    /// - The usage file cannot be read or written
    /// - Configuration files cannot be parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A document already exists at the target path.
    #[error("document already exists: {path}")]
    Conflict {
        /// Vault-relative path of the existing document.
        path: String,
    },

    /// A template with the requested title already exists.
    ///
    /// The store is left unmodified when this is returned.
    #[error("a prompt titled '{title}' already exists")]
    DuplicateTitle {
        /// The conflicting title.
        title: String,
    },

    /// The requested template or note does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for notecog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use notecog::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::operation("read_note", "permission denied");
        assert_eq!(
            err.to_string(),
            "operation 'read_note' failed: permission denied"
        );

        let err = Error::DuplicateTitle {
            title: "Summarize".to_string(),
        };
        assert_eq!(err.to_string(), "a prompt titled 'Summarize' already exists");

        let err = Error::Conflict {
            path: "prompts/A.md".to_string(),
        };
        assert_eq!(err.to_string(), "document already exists: prompts/A.md");
    }
}
