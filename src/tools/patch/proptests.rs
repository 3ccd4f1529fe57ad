//! Property-based tests for the patch applier
//!
//! Diffs are generated from `similar`'s line ops, so the parser and applier are checked
//! against an independent unified diff writer:
//! - applying a diff of (old, new) to old yields new exactly
//! - applying the same diff again to its own output fails
//! - a diff never applies to content whose changed lines were edited

#![allow(clippy::redundant_closure_for_method_calls)]

use super::apply::apply;
use super::parser::parse;
use super::PatchError;
use proptest::prelude::*;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write;
use std::ops::Range;

// ============================================================================
// Strategies
// ============================================================================

/// A small vocabulary keeps lines repeating, which stresses positional matching
fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("{".to_string()),
        Just("}".to_string()),
        "[a-d]{1,3}",
        "    [a-z ]{1,12}",
    ]
}

/// File content with or without a trailing newline
fn arb_content() -> impl Strategy<Value = String> {
    (prop::collection::vec(arb_line(), 0..25), any::<bool>()).prop_map(|(lines, trailing)| {
        let mut text = lines.join("\n");
        if trailing && !text.is_empty() {
            text.push('\n');
        }
        text
    })
}

/// Unified diff of `old` to `new` built from `similar`'s grouped ops.
///
/// Headers are computed from the op ranges and every line without a
/// trailing newline gets its own no-newline marker.
fn unified(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::from("--- a/f\n+++ b/f\n");
    for group in diff.grouped_ops(3) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;
        let _ = writeln!(out, "@@ -{} +{} @@", hunk_range(&old_range), hunk_range(&new_range));
        for op in &group {
            for change in diff.iter_changes(op) {
                out.push(match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                });
                let value = change.value();
                out.push_str(value);
                if !value.ends_with('\n') {
                    out.push_str("\n\\ No newline at end of file\n");
                }
            }
        }
    }
    out
}

/// `start,count` with the one-based start, or the preceding line for an empty range
fn hunk_range(range: &Range<usize>) -> String {
    if range.is_empty() {
        format!("{},0", range.start)
    } else {
        format!("{},{}", range.start + 1, range.len())
    }
}

fn apply_diff(source: &str, diff: &str) -> Result<Vec<u8>, PatchError> {
    let files = parse(diff)?;
    let first = files.first().ok_or(PatchError::Empty)?;
    apply(source.as_bytes(), first)
}

// ============================================================================
// Invariant 1: post-image is reproduced exactly
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_apply_yields_post_image(old in arb_content(), new in arb_content()) {
        prop_assume!(old != new);
        let diff = unified(&old, &new);

        let patched = apply_diff(&old, &diff).map_err(|e| {
            TestCaseError::fail(format!("{e}\n--- diff ---\n{diff}"))
        })?;
        prop_assert_eq!(String::from_utf8(patched).unwrap(), new);
    }

    #[test]
    fn prop_parse_finds_single_file(old in arb_content(), new in arb_content()) {
        prop_assume!(old != new);
        let files = parse(&unified(&old, &new)).unwrap();
        prop_assert_eq!(files.len(), 1);
        prop_assert!(!files[0].hunks.is_empty());
    }
}

#[test]
fn test_repeated_closing_braces_round_trip() {
    let (old, new) = ("a\n}\n", "}\n}\n");
    let diff = unified(old, new);

    assert!(diff.contains("@@ -1,2 +1,2 @@"), "{diff}");
    let patched = apply_diff(old, &diff).unwrap();
    assert_eq!(String::from_utf8(patched).unwrap(), new);
}

#[test]
fn test_missing_trailing_newline_round_trip() {
    let (old, new) = ("a\nb", "a\nc");
    let diff = unified(old, new);

    assert!(diff.contains("\\ No newline at end of file"), "{diff}");
    let patched = apply_diff(old, &diff).unwrap();
    assert_eq!(String::from_utf8(patched).unwrap(), new);
}

// ============================================================================
// Invariant 2: patches are not idempotent
//
// A diff that replaces a line with a different one cannot match its own
// output, because the removed line is no longer there.
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_second_application_fails(
        before in prop::collection::vec("[a-z]{1,8}", 0..10),
        after in prop::collection::vec("[a-z]{1,8}", 0..10),
        removed in "[a-z]{1,8}",
        added in "[A-Z]{1,8}",
    ) {
        let old = [before.clone(), vec![removed], after.clone()].concat().join("\n") + "\n";
        let new = [before, vec![added], after].concat().join("\n") + "\n";

        let diff = unified(&old, &new);
        let once = String::from_utf8(apply_diff(&old, &diff).unwrap()).unwrap();
        prop_assert_eq!(&once, &new);

        let twice = apply_diff(&once, &diff);
        prop_assert!(matches!(twice, Err(PatchError::Apply(_))), "second application: {:?}", twice);
    }
}

// ============================================================================
// Invariant 3: mismatched context is rejected, never silently applied
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_edited_source_rejected(
        lines in prop::collection::vec("[a-z]{1,8}", 1..15),
        idx in any::<prop::sample::Index>(),
    ) {
        let old = lines.join("\n") + "\n";
        let target = idx.index(lines.len());

        let mut new_lines = lines.clone();
        new_lines[target] = "REPLACED".to_string();
        let new = new_lines.join("\n") + "\n";
        let diff = unified(&old, &new);

        // Someone else edits the same line before the patch lands
        let mut drifted = lines;
        drifted[target] = "DRIFTED".to_string();
        let drifted = drifted.join("\n") + "\n";

        prop_assert!(matches!(apply_diff(&drifted, &diff), Err(PatchError::Apply(_))));
    }
}
