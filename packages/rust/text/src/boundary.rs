//! Rule-based sentence boundary detection.
//!
//! Splits after `.`, `!` or `?` (optionally followed by closing quotes or
//! brackets) when the next word looks like the start of a sentence, and never
//! after a known title, a dotted abbreviation or an initial.
//!
//! A lone capital letter counts as an initial only when a name follows it.
//! "Plan B. Smith agreed." is therefore read as one sentence.

use std::sync::LazyLock;

use regex::Regex;

use crate::SentenceBoundary;

/// Titles and abbreviations that end in a period but never end a sentence
/// (lowercase, without the trailing period).
const TITLES: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "ft", "gen", "gov", "sen", "rep",
    "rev", "capt", "col", "lt", "sgt", "hon", "vs", "approx", "ca", "cf",
];

/// Abbreviations that only continue the sentence before a number
/// (`No. 5`, `Sept. 12`, `fig. 3`).
const NUMBERED: &[&str] = &[
    "no", "vol", "fig", "p", "pp", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept",
    "oct", "nov", "dec",
];

/// Capitalized words that usually open a sentence rather than continue a name.
const SENTENCE_STARTERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "there", "then", "it", "its", "he", "she",
    "they", "we", "i", "you", "his", "her", "their", "our", "my", "in", "on", "at", "but", "and",
    "or", "so", "if", "as", "when", "while", "after", "before", "however", "some", "many", "most",
];

const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '}', '»'];
const OPENERS: &[char] = &['"', '\'', '“', '‘', '(', '[', '{', '«'];

/// Default [`SentenceBoundary`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedBoundary;

impl SentenceBoundary for RuleBasedBoundary {
    fn sentences(&self, text: &str) -> Vec<String> {
        static WORD_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\S+").expect("valid regex"));

        let words: Vec<_> = WORD_RE.find_iter(text).collect();
        let mut sentences = Vec::new();
        let mut start: Option<usize> = None;

        for (i, word) in words.iter().enumerate() {
            let sentence_start = *start.get_or_insert(word.start());
            let next = words.get(i + 1).map(|m| m.as_str());

            if next.is_none() || ends_sentence(word.as_str(), next) {
                sentences.push(text[sentence_start..word.end()].to_string());
                start = None;
            }
        }

        sentences
    }
}

/// Whether `word` closes a sentence, given the word that follows it.
fn ends_sentence(word: &str, next: Option<&str>) -> bool {
    let core = word.trim_end_matches(CLOSERS);
    let Some(last) = core.chars().last() else {
        return false;
    };
    if !matches!(last, '.' | '!' | '?') {
        return false;
    }

    let Some(next) = next else {
        return true;
    };
    if !starts_sentence(next) {
        return false;
    }

    if last != '.' || core.ends_with("...") {
        return true;
    }

    !is_abbreviation(core.trim_end_matches('.').trim_start_matches(OPENERS), next)
}

fn starts_sentence(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit() || OPENERS.contains(&c))
}

/// Initials (`J`), dotted abbreviations (`U.S`, `e.g`), known titles, and
/// numbered abbreviations when a number follows.
fn is_abbreviation(stem: &str, next: &str) -> bool {
    static DOTTED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(?:\p{L}\.)+\p{L}$").expect("valid regex"));

    let lower = stem.to_lowercase();
    if NUMBERED.contains(&lower.as_str()) && next.starts_with(|c: char| c.is_ascii_digit()) {
        return true;
    }

    if single_letter(stem).is_some() {
        return is_initial(stem) && precedes_name(next);
    }

    DOTTED_RE.is_match(stem) || TITLES.contains(&lower.as_str())
}

fn single_letter(word: &str) -> Option<char> {
    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// An uppercase letter, with or without its period.
fn is_initial(word: &str) -> bool {
    single_letter(word.strip_suffix('.').unwrap_or(word)).is_some_and(char::is_uppercase)
}

/// Whether `next` continues a name: another initial, or a capitalized word
/// that is not a common sentence opener.
fn precedes_name(next: &str) -> bool {
    let word = next.trim_start_matches(OPENERS);
    if word.ends_with('.') && is_initial(word) {
        return true;
    }

    let bare = word.trim_end_matches(|c: char| !c.is_alphanumeric());
    bare.chars().next().is_some_and(char::is_uppercase)
        && !SENTENCE_STARTERS.contains(&bare.to_lowercase().as_str())
}
