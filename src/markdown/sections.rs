//! Heading-scoped sections.
//!
//! A section starts at the first ATX heading whose text equals the target and
//! runs up to, but not including, the next heading of equal or higher level.
//! Headings inside fenced code blocks (backtick or tilde) are ignored.

/// A parsed ATX heading line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading<'a> {
    /// Heading level, 1 through 6.
    pub level: usize,
    /// Heading text with markers and closing hashes removed.
    pub text: &'a str,
}

/// Parses an ATX heading line (`## Title`).
///
/// Allows up to three leading spaces. The hashes must be followed by
/// whitespace or end the line; an optional closing `#` sequence is stripped.
#[must_use]
pub fn parse_heading(line: &str) -> Option<Heading<'_>> {
    let line = line.trim_end();
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let level = rest.len() - rest.trim_start_matches('#').len();
    if !(1..=6).contains(&level) {
        return None;
    }
    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }

    let mut text = after.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.is_empty() {
        text = "";
    } else if without_closing.len() != text.len() && without_closing.ends_with([' ', '\t']) {
        text = without_closing.trim_end();
    }

    Some(Heading { level, text })
}

/// Tracks whether a line scan is inside a fenced code block.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Feeds one line; returns true if the line is a fence or inside one.
    pub(crate) fn is_code(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~');
        let run = marker.map_or(0, |c| trimmed.len() - trimmed.trim_start_matches(c).len());

        match (self.open, marker) {
            (Some((open_char, open_len)), Some(c)) if c == open_char && run >= open_len => {
                if trimmed.trim_start_matches(c).trim().is_empty() {
                    self.open = None;
                }
                true
            },
            (Some(_), _) => true,
            (None, Some(c)) if run >= 3 => {
                self.open = Some((c, run));
                true
            },
            (None, _) => false,
        }
    }
}

/// Extracts the section under `heading`, including the heading line itself.
///
/// The heading text is compared exactly after trimming both sides. Returns
/// `None` when no heading matches.
///
/// # Examples
///
/// ```rust
/// use notecog::markdown::extract_section;
///
/// let note = "# Title\n## Intro\nHello.\n### Detail\nMore.\n## Next\nBye.";
/// let section = extract_section(note, "Intro").unwrap();
/// assert_eq!(section, "## Intro\nHello.\n### Detail\nMore.");
/// ```
#[must_use]
pub fn extract_section(content: &str, heading: &str) -> Option<String> {
    let target = heading.trim();
    let lines: Vec<&str> = content.lines().collect();
    let mut fences = FenceTracker::default();
    let mut start: Option<(usize, usize)> = None;

    for (index, line) in lines.iter().enumerate() {
        if fences.is_code(line) {
            continue;
        }
        let Some(parsed) = parse_heading(line) else {
            continue;
        };
        match start {
            None if parsed.text == target => start = Some((index, parsed.level)),
            Some((first, level)) if parsed.level <= level => {
                return Some(join_section(&lines[first..index]));
            },
            _ => {},
        }
    }

    start.map(|(first, _)| join_section(&lines[first..]))
}

fn join_section(lines: &[&str]) -> String {
    lines.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = "\
# Note A

Preamble.

## Intro

Intro text.

### Detail

Nested text.

## Body

Body text.
";

    #[test]
    fn test_parse_heading() {
        assert_eq!(
            parse_heading("## Intro"),
            Some(Heading {
                level: 2,
                text: "Intro"
            })
        );
        assert_eq!(parse_heading("   # Spaced   ").map(|h| h.text), Some("Spaced"));
        assert_eq!(parse_heading("## Closed ##").map(|h| h.text), Some("Closed"));
        assert_eq!(parse_heading("## C#").map(|h| h.text), Some("C#"));
        assert_eq!(parse_heading("#").map(|h| h.level), Some(1));
        assert_eq!(parse_heading("#tag"), None);
        assert_eq!(parse_heading("####### seven"), None);
        assert_eq!(parse_heading("    # indented code"), None);
    }

    #[test]
    fn test_extract_section_stops_at_same_level() {
        let section = extract_section(NOTE, "Intro").unwrap();
        assert_eq!(section, "## Intro\n\nIntro text.\n\n### Detail\n\nNested text.");
    }

    #[test]
    fn test_extract_section_stops_at_higher_level() {
        let section = extract_section(NOTE, "Detail").unwrap();
        assert_eq!(section, "### Detail\n\nNested text.");
    }

    #[test]
    fn test_extract_section_runs_to_end() {
        let section = extract_section(NOTE, " Body ").unwrap();
        assert_eq!(section, "## Body\n\nBody text.");
    }

    #[test]
    fn test_extract_section_missing() {
        assert!(extract_section(NOTE, "Nope").is_none());
        assert!(extract_section(NOTE, "intro").is_none());
    }

    #[test]
    fn test_extract_section_first_match_wins() {
        let note = "## A\none\n## A\ntwo";
        assert_eq!(extract_section(note, "A").unwrap(), "## A\none");
    }

    #[test]
    fn test_headings_in_code_blocks_ignored() {
        let note = "## Intro\n```md\n## Fake\n```\nstill intro\n~~~\n# Also fake\n~~~\n## Next";
        let section = extract_section(note, "Intro").unwrap();
        assert!(section.contains("still intro"));
        assert!(section.contains("# Also fake"));
        assert!(!section.contains("## Next"));

        assert!(extract_section(note, "Fake").is_none());
    }
}
