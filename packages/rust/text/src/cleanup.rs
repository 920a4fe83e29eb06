//! Sanitization passes for raw encyclopedia text.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run both sanitization passes on raw source text.
pub fn sanitize(raw: &str) -> String {
    let without_markup = remove_blank_lines_and_markup(raw);
    remove_parentheticals(&without_markup)
}

// ---------------------------------------------------------------------------
// Pass 1: Drop blank lines and wiki headings
// ---------------------------------------------------------------------------

/// Drop empty lines and lines starting with `=`, joining the rest with a space.
pub fn remove_blank_lines_and_markup(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('=')
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Pass 2: Strip parenthesized annotations
// ---------------------------------------------------------------------------

/// Remove parenthesized groups (one nesting level deep) and collapse the
/// double spaces left behind.
///
/// Groups nested two or more levels deep are only stripped from the inside,
/// so the outer parentheses survive.
pub fn remove_parentheticals(text: &str) -> String {
    static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\((?:\([^()]*\)|[^()])*\)").expect("valid regex")
    });

    PAREN_RE.replace_all(text, "").replace("  ", " ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
