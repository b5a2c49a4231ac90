//! Prompt template models.

use serde::{Deserialize, Serialize};

/// A stored prompt template.
///
/// The title is the unique key inside the prompt folder; the document backing
/// it is `<folder>/<title>.<ext>` and its body is the raw template text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Unique template title.
    pub title: String,
    /// Raw template text with `{...}` and `[[...]]` references.
    pub content: String,
}

impl PromptTemplate {
    /// Creates a new prompt template.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// When a template was last used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Template title.
    pub title: String,
    /// Unix epoch seconds of the last use.
    pub last_used: u64,
}
