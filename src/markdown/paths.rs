//! Note path patterns used by `{path}` variables.

use crate::models::NoteHandle;

/// Normalizes the text of a path variable.
///
/// Trims whitespace, unwraps a surrounding `[[...]]`, converts `\` to `/`,
/// and strips leading `./` or `/` and trailing `/`.
#[must_use]
pub fn normalize_note_path(pattern: &str) -> String {
    let mut pattern = pattern.trim();
    if let Some(inner) = pattern
        .strip_prefix("[[")
        .and_then(|p| p.strip_suffix("]]"))
    {
        pattern = inner;
    }
    let pattern = pattern.replace('\\', "/");

    let mut rest = pattern.trim();
    loop {
        let next = rest.trim_start_matches("./").trim_matches('/').trim();
        if next == rest {
            return rest.to_string();
        }
        rest = next;
    }
}

/// Returns true if the note matches a normalized path pattern.
///
/// A note matches when the pattern equals its path (with or without the
/// extension), names a folder containing it, or equals its basename ignoring
/// case. An empty pattern matches nothing.
#[must_use]
pub fn path_matches(handle: &NoteHandle, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    handle.path() == pattern
        || handle.path_without_extension() == pattern
        || handle.is_under(pattern)
        || handle.basename().eq_ignore_ascii_case(pattern)
}
