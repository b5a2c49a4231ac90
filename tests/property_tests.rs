//! Property-based tests for template scanning and expansion.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Templates without reference syntax expand to themselves plus a separator
//! - Scanners never panic and report positions inside the template
//! - Path normalization is idempotent
//! - Section extraction returns text that starts with the heading

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use notecog::markdown::{extract_section, normalize_note_path};
use notecog::models::{VariableKind, scan_note_links, scan_variables};
use notecog::{MemoryVault, NoteRepository, PromptExpander};
use proptest::prelude::*;

proptest! {
    /// Property: text with no braces or brackets passes through unchanged.
    #[test]
    fn prop_plain_template_is_identity(template in "[^{}\\[\\]]{0,200}", selection in ".{0,40}") {
        let vault: Arc<dyn NoteRepository> = Arc::new(MemoryVault::new());
        let expander = PromptExpander::new(vault);
        let prompt = tokio_test::block_on(expander.expand(&template, &selection, None));
        prop_assert_eq!(prompt, format!("{template}\n\n"));
    }

    /// Property: every scanned variable starts with `{` at its position.
    #[test]
    fn prop_variable_positions_point_at_braces(template in ".{0,200}") {
        for reference in scan_variables(&template) {
            prop_assert_eq!(template.as_bytes()[reference.position], b'{');
            prop_assert_eq!(reference.raw.trim(), reference.raw.as_str());
            if reference.kind == VariableKind::LiteralSelection {
                prop_assert!(template[reference.position..].starts_with("{}"), "literal selection must start with {{}}");
            }
        }
    }

    /// Property: every scanned link starts with `[[` and has a title.
    #[test]
    fn prop_link_positions_point_at_brackets(template in ".{0,200}") {
        for link in scan_note_links(&template) {
            prop_assert!(template[link.position..].starts_with("[["));
            prop_assert!(!link.title.is_empty());
        }
    }

    /// Property: scanning `{name}` yields exactly one variable with that raw text.
    #[test]
    fn prop_single_variable_round_trips(name in "[A-Za-z0-9 _/-]{1,30}") {
        prop_assume!(!name.trim().is_empty());
        let refs = scan_variables(&format!("before {{{name}}} after"));
        prop_assert_eq!(refs.len(), 1);
        prop_assert_eq!(refs[0].raw.as_str(), name.trim());
    }

    /// Property: normalizing a path twice changes nothing.
    #[test]
    fn prop_normalize_note_path_idempotent(path in "[A-Za-z0-9 ./\\\\_-]{0,40}") {
        let once = normalize_note_path(&path);
        prop_assert_eq!(normalize_note_path(&once), once.clone());
        prop_assert!(!once.starts_with('/'));
        prop_assert!(!once.ends_with('/'));
    }

    /// Property: an extracted section starts with its heading line.
    #[test]
    fn prop_section_starts_with_heading(
        level in 1usize..=6,
        heading in "[A-Za-z][A-Za-z0-9 ]{0,20}",
        body in "[a-z .\n]{0,80}",
    ) {
        let heading = heading.trim().to_string();
        let marker = "#".repeat(level);
        let note = format!("intro\n{marker} {heading}\n{body}");
        let section = extract_section(&note, &heading).expect("heading exists");
        let expected_start = format!("{marker} {heading}");
        prop_assert!(section.starts_with(&expected_start));
    }
}
