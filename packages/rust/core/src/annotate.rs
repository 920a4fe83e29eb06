//! Keyword annotation of segmented sentences.
//!
//! Sentences are sent to the keyword extractor one at a time, in order; the
//! next request is not issued until the previous one has resolved. The first
//! failure aborts the whole pass.

use std::time::Duration;

use tracing::{debug, error, info, instrument};

use narrator_keywords::KeywordExtractor;
use narrator_shared::{NarratorError, Result, Sentence};

/// Progress callback for the annotation pass.
pub trait AnnotationProgress: Send + Sync {
    /// Called after sentence `current` (1-based) of `total` received its keywords.
    fn sentence_annotated(&self, current: usize, total: usize);
}

/// No-op annotation progress.
pub struct SilentAnnotation;

impl AnnotationProgress for SilentAnnotation {
    fn sentence_annotated(&self, _current: usize, _total: usize) {}
}

/// Attach keywords to every sentence, strictly in sequence.
///
/// Each request is bounded by `timeout`. On error the sentences before the
/// failing one keep their new keywords and the rest are left untouched; the
/// error names the 0-based index of the failing sentence.
#[instrument(skip_all, fields(sentences = sentences.len()))]
pub async fn annotate(
    sentences: &mut [Sentence],
    extractor: &dyn KeywordExtractor,
    timeout: Duration,
    progress: &dyn AnnotationProgress,
) -> Result<()> {
    let total = sentences.len();

    for (index, sentence) in sentences.iter_mut().enumerate() {
        let keywords = match tokio::time::timeout(timeout, extractor.keywords(&sentence.text)).await
        {
            Ok(Ok(keywords)) => keywords,
            Ok(Err(e)) => {
                error!(index, error = %e, "keyword extraction failed");
                return Err(NarratorError::annotation(index, e.to_string()));
            }
            Err(_) => {
                error!(index, ?timeout, "keyword extraction timed out");
                return Err(NarratorError::annotation(
                    index,
                    format!("timed out after {timeout:?}"),
                ));
            }
        };

        debug!(index, count = keywords.len(), "sentence annotated");
        sentence.keywords = keywords;
        progress.sentence_annotated(index + 1, total);
    }

    info!(total, "annotation complete");
    Ok(())
}
