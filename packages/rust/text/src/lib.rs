//! Text stages of the Narrator pipeline: sanitize, segment, limit.
//!
//! All three are pure functions over strings and sentence vectors. Sentence
//! boundary detection sits behind the [`SentenceBoundary`] trait so callers
//! can swap the default [`RuleBasedBoundary`] for another tokenizer.

mod boundary;
mod cleanup;

use tracing::debug;

use narrator_shared::Sentence;

pub use boundary::RuleBasedBoundary;
pub use cleanup::{remove_blank_lines_and_markup, remove_parentheticals, sanitize};

// ---------------------------------------------------------------------------
// Sentence boundary capability
// ---------------------------------------------------------------------------

/// Splits natural-language text into an ordered list of sentence strings.
pub trait SentenceBoundary: Send + Sync {
    fn sentences(&self, text: &str) -> Vec<String>;
}

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Split sanitized text into unannotated [`Sentence`] records, in order.
///
/// Blank strings returned by the detector are skipped so every record has
/// non-empty text.
pub fn segment(text: &str, boundary: &dyn SentenceBoundary) -> Vec<Sentence> {
    let sentences: Vec<Sentence> = boundary
        .sentences(text)
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .map(Sentence::new)
        .collect();

    debug!(count = sentences.len(), "segmented text");
    sentences
}

// ---------------------------------------------------------------------------
// Limiter
// ---------------------------------------------------------------------------

/// Keep the first `maximum` sentences. Zero or negative keeps none.
pub fn limit(mut sentences: Vec<Sentence>, maximum: i64) -> Vec<Sentence> {
    let keep = if maximum <= 0 {
        0
    } else {
        usize::try_from(maximum).unwrap_or(usize::MAX)
    };
    sentences.truncate(keep);
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Detector returning a fixed list, standing in for an external tokenizer.
    struct Scripted(Vec<&'static str>);

    impl SentenceBoundary for Scripted {
        fn sentences(&self, _text: &str) -> Vec<String> {
            self.0.iter().map(|s| s.to_string()).collect()
        }
    }

    fn texts(sentences: &[Sentence]) -> Vec<&str> {
        sentences.iter().map(|s| s.text.as_str()).collect()
    }

    fn numbered(n: usize) -> Vec<Sentence> {
        (0..n).map(|i| Sentence::new(format!("Sentence {i}."))).collect()
    }

    #[test]
    fn segment_wraps_sentences_without_annotations() {
        let sentences = segment("Hello world. This is a test.", &RuleBasedBoundary);
        assert_eq!(
            sentences,
            vec![Sentence::new("Hello world."), Sentence::new("This is a test.")]
        );
        assert!(sentences.iter().all(|s| s.keywords.is_empty() && s.images.is_empty()));
    }

    #[test]
    fn segment_empty_input() {
        assert!(segment("", &RuleBasedBoundary).is_empty());
    }

    #[test]
    fn segment_preserves_detector_order_and_skips_blanks() {
        let detector = Scripted(vec!["Second.", "  ", "First.", ""]);
        let sentences = segment("ignored", &detector);
        assert_eq!(texts(&sentences), vec!["Second.", "First."]);
    }

    #[test]
    fn limit_truncates_to_prefix() {
        let all = numbered(5);
        let kept = limit(all.clone(), 2);
        assert_eq!(kept, all[..2]);
    }

    #[test]
    fn limit_larger_than_len_keeps_all() {
        let all = numbered(3);
        assert_eq!(limit(all.clone(), 10), all);
    }

    #[test]
    fn limit_at_i64_max_keeps_all() {
        let all = numbered(3);
        assert_eq!(limit(all.clone(), i64::MAX), all);
    }

    #[test]
    fn limit_zero_or_negative_keeps_none() {
        assert!(limit(numbered(3), 0).is_empty());
        assert!(limit(numbered(3), -4).is_empty());
    }

    #[test]
    fn limit_length_matches_min_rule() {
        for len in 0..6 {
            for m in -2..8_i64 {
                let all = numbered(len);
                let kept = limit(all.clone(), m);
                let expected = len.min(m.max(0) as usize);
                assert_eq!(kept.len(), expected, "len={len} m={m}");
                assert_eq!(kept[..], all[..expected]);
            }
        }
    }
}
