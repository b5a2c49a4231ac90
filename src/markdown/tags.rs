//! Tag extraction.
//!
//! Tags come from two places:
//! - the `tags` (or `tag`) front matter key, as a list or a comma/space separated string
//! - inline `#tag` tokens in the body, outside fenced code blocks
//!
//! Tags are returned lowercase and without the leading `#`. Nested tags keep
//! their slashes (`#project/alpha` becomes `project/alpha`).

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::frontmatter::FrontMatter;
use super::sections::FenceTracker;

/// Inline tag: `#` at line start or after whitespace, then tag characters.
static INLINE_TAG_PATTERN: LazyLock<Regex> = lazy_regex!(r"(?:^|\s)#([\p{L}\p{N}_/-]+)");

/// Extracts every tag of a note.
///
/// Malformed front matter is ignored rather than failing the whole note.
#[must_use]
pub fn extract_tags(content: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();

    let body = match FrontMatter::parse(content) {
        Ok((metadata, body)) => {
            for key in ["tags", "tag"] {
                collect_front_matter_tags(&metadata[key], &mut tags);
            }
            body
        },
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed front matter while reading tags");
            FrontMatter::body(content)
        },
    };

    let mut fences = FenceTracker::default();
    for line in body.lines() {
        if fences.is_code(line) {
            continue;
        }
        for cap in INLINE_TAG_PATTERN.captures_iter(line) {
            if let Some(tag) = cap.get(1).map(|m| m.as_str())
                && is_valid_tag(tag)
            {
                tags.insert(tag.to_lowercase());
            }
        }
    }

    tags
}

fn collect_front_matter_tags(value: &serde_json::Value, tags: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::String(s) => {
            for tag in s.split([',', ' ']) {
                insert_tag(tag, tags);
            }
        },
        serde_json::Value::Array(items) => {
            for item in items {
                if let Some(tag) = item.as_str() {
                    insert_tag(tag, tags);
                }
            }
        },
        _ => {},
    }
}

fn insert_tag(raw: &str, tags: &mut BTreeSet<String>) {
    let tag = raw.trim().trim_start_matches('#');
    if is_valid_tag(tag) {
        tags.insert(tag.to_lowercase());
    }
}

/// A tag needs at least one non-numeric character.
fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && !tag.chars().all(|c| c.is_ascii_digit())
}

/// Returns true if `note_tag` satisfies the `query` tag.
///
/// Matching ignores case and a leading `#`; a parent tag matches its nested
/// tags (`project` matches `project/alpha`).
#[must_use]
pub fn tag_matches(note_tag: &str, query: &str) -> bool {
    let note_tag = note_tag.trim_start_matches('#').to_lowercase();
    let query = query.trim().trim_start_matches('#').to_lowercase();
    if query.is_empty() {
        return false;
    }
    note_tag == query
        || note_tag
            .strip_prefix(&query)
            .is_some_and(|rest| rest.starts_with('/'))
}
