//! Storage layer abstraction.
//!
//! - [`NoteRepository`]: read/write access to a note vault
//!   ([`FilesystemVault`] on disk, [`MemoryVault`] in memory)
//! - [`UsageTracker`]: last-use timestamps for prompt ranking

mod filesystem;
mod memory;
mod traits;
mod usage;

pub use filesystem::FilesystemVault;
pub use memory::MemoryVault;
pub use traits::NoteRepository;
pub use usage::UsageTracker;
