//! Business logic services.
//!
//! Services orchestrate a [`crate::storage::NoteRepository`] and provide the
//! high-level operations: template expansion and template management.
//!
//! ```text
//! PromptService ── PromptExpander ─┬─ VariableResolver   ({...})
//!                                  └─ NoteLinkResolver   ([[...]])
//! ```

mod note_link_resolver;
mod notifier;
mod prompt;
mod prompt_expander;
mod registry;
mod variable_resolver;

pub use note_link_resolver::NoteLinkResolver;
pub use notifier::{Notice, Notifier, RecordingNotifier, TracingNotifier};
pub use prompt::PromptService;
pub use prompt_expander::PromptExpander;
pub use registry::PromptServiceRegistry;
pub use variable_resolver::{ResolvedVariable, VariableResolver};
