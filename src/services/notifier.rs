//! User-visible notices.
//!
//! Expansion never fails because a note is missing. Instead, problems worth
//! telling the user about are delivered to a [`Notifier`] and expansion
//! carries on. A `[[link]]` to a missing note is deliberately silent and has
//! no notice.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A soft problem found while expanding a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// `{activeNote}` was used but no note is focused.
    NoActiveNote {
        /// Raw variable text.
        variable: String,
    },
    /// A tag or path variable matched no notes.
    UnresolvedVariable {
        /// Raw variable text.
        variable: String,
    },
    /// A matched note could not be read.
    NoteReadFailed {
        /// Vault-relative path.
        path: String,
        /// Underlying error.
        cause: String,
    },
}

impl Notice {
    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoActiveNote { .. } => "no_active_note",
            Self::UnresolvedVariable { .. } => "unresolved_variable",
            Self::NoteReadFailed { .. } => "note_read_failed",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveNote { variable } => {
                write!(f, "No active note found for {{{variable}}}.")
            },
            Self::UnresolvedVariable { variable } => {
                write!(f, "No notes found for {{{variable}}}.")
            },
            Self::NoteReadFailed { path, cause } => write!(f, "Could not read {path}: {cause}"),
        }
    }
}

/// Receives notices raised during expansion.
pub trait Notifier: Send + Sync {
    /// Delivers one notice.
    fn notify(&self, notice: &Notice);
}

/// Notifier that logs notices at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::warn!(kind = notice.kind(), "{notice}");
    }
}

/// Notifier that keeps every notice for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded notices.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the recorded notices.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::debug!(kind = notice.kind(), "{notice}");
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}
