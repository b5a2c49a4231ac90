//! Markdown helpers shared by repositories and resolvers.
//!
//! This is not a renderer. It only understands the pieces of note syntax the
//! expansion engine needs: front matter, ATX headings, fenced code blocks,
//! and tags.

mod frontmatter;
mod paths;
mod sections;
mod tags;

pub use frontmatter::FrontMatter;
pub use paths::{normalize_note_path, path_matches};
pub use sections::{Heading, extract_section, parse_heading};
pub use tags::{extract_tags, tag_matches};
