//! Data models for notecog.
//!
//! Templates and usage records are persistent; references and content blocks
//! live only for the duration of one expansion.

mod note;
mod prompt;
mod reference;

pub use note::NoteHandle;
pub use prompt::{PromptTemplate, UsageRecord};
pub use reference::{
    ContentBlock, NoteLinkReference, SELECTION_PLACEHOLDER, VariableKind, VariableReference,
    scan_note_links, scan_variables,
};
