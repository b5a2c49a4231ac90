//! Template references and resolved content.
//!
//! Two independent single-pass scanners find the references inside a prompt
//! template:
//!
//! | Syntax | Scanner | Result |
//! |--------|---------|--------|
//! | `{}` | [`scan_variables`] | [`VariableKind::LiteralSelection`] |
//! | `{activeNote}` | [`scan_variables`] | [`VariableKind::ActiveNote`] |
//! | `{#tag1,#tag2}` | [`scan_variables`] | [`VariableKind::TagSet`] |
//! | `{Folder/Note}` | [`scan_variables`] | [`VariableKind::PathPattern`] |
//! | `[[Note]]`, `[[Note#Heading]]` | [`scan_note_links`] | [`NoteLinkReference`] |
//!
//! # Known syntax limitation
//!
//! Braces do not nest. A `{` appearing before the closing `}` of an earlier
//! `{` abandons the earlier span and the scan restarts at the inner `{`, so
//! `{a{b}` yields a single variable `b`.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// `{...}` with no nested braces; the capture may be empty (`{}`).
static VARIABLE_PATTERN: LazyLock<Regex> = lazy_regex!(r"\{([^{}]*)\}");

/// `[[...]]` with no nested brackets.
static NOTE_LINK_PATTERN: LazyLock<Regex> = lazy_regex!(r"\[\[([^\[\]]+)\]\]");

/// The literal selection placeholder.
pub const SELECTION_PLACEHOLDER: &str = "{}";

/// What a `{...}` reference asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    /// The literal `{}` placeholder for the user's selection.
    LiteralSelection,
    /// The currently focused note.
    ActiveNote,
    /// Every note carrying any of these tags (without `#`).
    TagSet(BTreeSet<String>),
    /// Notes whose path matches this (unnormalized) pattern.
    PathPattern(String),
}

impl VariableKind {
    /// Classifies the trimmed inner text of a `{...}` span.
    #[must_use]
    pub fn classify(inner: &str) -> Self {
        let inner = inner.trim();
        if inner.is_empty() {
            return Self::LiteralSelection;
        }
        if inner.eq_ignore_ascii_case("activenote") {
            return Self::ActiveNote;
        }
        if let Some(rest) = inner.strip_prefix('#') {
            let tags = rest
                .split(',')
                .map(|t| t.trim().trim_start_matches('#').trim())
                .filter(|t| !t.is_empty())
                .map(ToString::to_string)
                .collect();
            return Self::TagSet(tags);
        }
        Self::PathPattern(inner.to_string())
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LiteralSelection => "selection",
            Self::ActiveNote => "active_note",
            Self::TagSet(_) => "tags",
            Self::PathPattern(_) => "path",
        }
    }
}

/// A `{...}` reference found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// Classified kind.
    pub kind: VariableKind,
    /// Trimmed inner text, e.g. `activeNote` or `#tagA,#tagB`.
    pub raw: String,
    /// Byte offset of the opening `{`.
    pub position: usize,
}

/// A `[[...]]` reference found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLinkReference {
    /// Inner text exactly as written between the brackets.
    pub raw: String,
    /// Target note title.
    pub title: String,
    /// Optional heading scoping the content.
    pub heading: Option<String>,
    /// Byte offset of the opening `[[`.
    pub position: usize,
}

impl NoteLinkReference {
    /// Parses the inner text of a `[[...]]` span.
    ///
    /// An alias (`[[Note|Shown]]`) is dropped, then the target is split on its
    /// first `#` into title and heading. Both parts are trimmed; an empty
    /// heading becomes `None`.
    #[must_use]
    pub fn parse(inner: &str, position: usize) -> Self {
        let target = inner.split('|').next().unwrap_or(inner);
        let (title, heading) = match target.split_once('#') {
            Some((title, heading)) => {
                let heading = heading.trim();
                (
                    title.trim(),
                    (!heading.is_empty()).then(|| heading.to_string()),
                )
            },
            None => (target.trim(), None),
        };

        Self {
            raw: inner.to_string(),
            title: title.to_string(),
            heading,
            position,
        }
    }

    /// The label used for this link's block: the link as written.
    #[must_use]
    pub fn label(&self) -> String {
        format!("[[{}]]", self.raw)
    }
}

/// Resolved content for one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    /// Source name of the content.
    pub label: String,
    /// Resolved text.
    pub content: String,
}

impl ContentBlock {
    /// Creates a new content block.
    #[must_use]
    pub fn new(label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            content: content.into(),
        }
    }
}

impl fmt::Display for ContentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n\n{}:\n\n{}", self.label, self.content)
    }
}

/// Scans a template for `{...}` references in left-to-right order.
///
/// Whitespace-only spans such as `{ }` are not references. Duplicates are
/// reported at every position; callers decide how to collapse them.
#[must_use]
pub fn scan_variables(template: &str) -> Vec<VariableReference> {
    VARIABLE_PATTERN
        .captures_iter(template)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let inner = cap.get(1).map_or("", |m| m.as_str());
            if inner.is_empty() {
                return Some(VariableReference {
                    kind: VariableKind::LiteralSelection,
                    raw: String::new(),
                    position: whole.start(),
                });
            }
            let raw = inner.trim();
            if raw.is_empty() {
                return None;
            }
            Some(VariableReference {
                kind: VariableKind::classify(raw),
                raw: raw.to_string(),
                position: whole.start(),
            })
        })
        .collect()
}

/// Scans a template for `[[...]]` references in left-to-right order.
///
/// Links whose title is empty (`[[#Heading]]`) are skipped.
#[must_use]
pub fn scan_note_links(template: &str) -> Vec<NoteLinkReference> {
    NOTE_LINK_PATTERN
        .captures_iter(template)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let inner = cap.get(1)?.as_str();
            let link = NoteLinkReference::parse(inner, whole.start());
            (!link.title.is_empty()).then_some(link)
        })
        .collect()
}
