//! End-to-end text pipeline: load → fetch → sanitize → segment → limit → annotate → save.

use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use narrator_content::ContentSource;
use narrator_keywords::KeywordExtractor;
use narrator_shared::{Document, NarratorError, Result, RunId};
use narrator_storage::DocumentStore;
use narrator_text::SentenceBoundary;

use crate::annotate::{self, AnnotationProgress};

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// One step of the pipeline. Each stage reads only fields filled by earlier
/// stages and writes only its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// `searchTerm` → `sourceContentOriginal`
    FetchContent,
    /// `sourceContentOriginal` → `sourceContentSanitized`
    Sanitize,
    /// `sourceContentSanitized` → `sentences`
    Segment,
    /// `sentences` → first `maximumSentences` of `sentences`
    Limit,
    /// `sentences[].text` → `sentences[].keywords`
    Annotate,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::FetchContent,
        Stage::Sanitize,
        Stage::Segment,
        Stage::Limit,
        Stage::Annotate,
    ];

    /// Stable name used in logs and progress output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchContent => "fetch_content",
            Self::Sanitize => "sanitize",
            Self::Segment => "segment",
            Self::Limit => "limit",
            Self::Annotate => "annotate",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Identifier logged with every event of this run.
    pub run_id: RunId,
    /// Key the document was loaded from and saved to.
    pub document_key: String,
    /// Sentences kept after limiting.
    pub sentence_count: usize,
    /// Keywords attached across all sentences.
    pub keyword_count: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a stage.
    fn stage(&self, stage: Stage);
    /// Called after each sentence is annotated.
    fn sentence_annotated(&self, current: usize, total: usize);
    /// Called when the run completes and the document is saved.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn sentence_annotated(&self, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Adapts a `ProgressReporter` to the `AnnotationProgress` interface.
struct PipelineAnnotationProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl AnnotationProgress for PipelineAnnotationProgress<'_> {
    fn sentence_annotated(&self, current: usize, total: usize) {
        self.inner.sentence_annotated(current, total);
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Upper bounds on each outbound call.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Bound on the single content fetch.
    pub content: Duration,
    /// Bound on each per-sentence keyword request.
    pub keywords: Duration,
}

/// The text pipeline with its collaborators injected.
pub struct Pipeline<'a> {
    pub store: &'a dyn DocumentStore,
    pub content: &'a dyn ContentSource,
    pub boundary: &'a dyn SentenceBoundary,
    pub keywords: &'a dyn KeywordExtractor,
    pub timeouts: Timeouts,
}

impl Pipeline<'_> {
    /// Run every stage against the document stored under `key`.
    ///
    /// The document is saved only if all stages succeed; a failed run leaves
    /// the stored document exactly as it was.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn run(&self, key: &str, progress: &dyn ProgressReporter) -> Result<RunReport> {
        let start = Instant::now();
        let run_id = RunId::new();

        let mut document = self.store.load(key)?;
        info!(
            %run_id,
            search_term = %document.search_term,
            maximum_sentences = document.maximum_sentences,
            "starting text pipeline"
        );

        for stage in Stage::ALL {
            progress.stage(stage);
            info!(%run_id, %stage, "running stage");

            if let Err(e) = self.run_stage(stage, &mut document, progress).await {
                error!(%run_id, %stage, error = %e, "stage failed, document not saved");
                return Err(e);
            }
        }

        self.store.save(key, &document)?;

        let report = RunReport {
            run_id,
            document_key: key.to_string(),
            sentence_count: document.sentences.len(),
            keyword_count: document.keyword_count(),
            elapsed: start.elapsed(),
        };

        progress.done(&report);

        info!(
            run_id = %report.run_id,
            sentences = report.sentence_count,
            keywords = report.keyword_count,
            elapsed_ms = report.elapsed.as_millis(),
            "text pipeline complete"
        );

        Ok(report)
    }

    /// Run a single stage against an in-memory document.
    pub async fn run_stage(
        &self,
        stage: Stage,
        document: &mut Document,
        progress: &dyn ProgressReporter,
    ) -> Result<()> {
        match stage {
            Stage::FetchContent => {
                document.source_content_original =
                    fetch_content(&document.search_term, self.content, self.timeouts.content)
                        .await?;
            }
            Stage::Sanitize => {
                document.source_content_sanitized =
                    narrator_text::sanitize(&document.source_content_original);
            }
            Stage::Segment => {
                document.sentences =
                    narrator_text::segment(&document.source_content_sanitized, self.boundary);
            }
            Stage::Limit => {
                let sentences = std::mem::take(&mut document.sentences);
                document.sentences = narrator_text::limit(sentences, document.maximum_sentences);
            }
            Stage::Annotate => {
                let adapter = PipelineAnnotationProgress { inner: progress };
                annotate::annotate(
                    &mut document.sentences,
                    self.keywords,
                    self.timeouts.keywords,
                    &adapter,
                )
                .await?;
            }
        }
        Ok(())
    }
}

/// Fetch raw text for `search_term`, bounded by `timeout`.
#[instrument(skip(source))]
pub async fn fetch_content(
    search_term: &str,
    source: &dyn ContentSource,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, source.fetch(search_term, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(NarratorError::RemoteFetch(format!(
            "{search_term}: timed out after {timeout:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use narrator_keywords::KeywordError;
    use narrator_shared::Sentence;
    use narrator_storage::{JsonFileStore, MemoryStore};
    use narrator_text::RuleBasedBoundary;

    const KEY: &str = "content.json";

    const TIMEOUTS: Timeouts = Timeouts {
        content: Duration::from_secs(5),
        keywords: Duration::from_secs(5),
    };

    /// Returns a fixed article body (or failure) and counts calls.
    struct FixedContent {
        reply: std::result::Result<&'static str, &'static str>,
        delay: Duration,
        calls: Mutex<Vec<String>>,
    }

    impl FixedContent {
        fn ok(text: &'static str) -> Self {
            Self {
                reply: Ok(text),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(msg: &'static str) -> Self {
            Self {
                reply: Err(msg),
                ..Self::ok("")
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentSource for FixedContent {
        async fn fetch(&self, search_term: &str, _timeout: Duration) -> Result<String> {
            self.calls.lock().unwrap().push(search_term.to_string());
            tokio::time::sleep(self.delay).await;
            self.reply
                .map(String::from)
                .map_err(|msg| NarratorError::RemoteFetch(msg.to_string()))
        }
    }

    /// Replies from a fixed script, one entry per call.
    struct ScriptedKeywords {
        replies: Mutex<VecDeque<std::result::Result<Vec<String>, KeywordError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedKeywords {
        fn new(replies: Vec<std::result::Result<Vec<&str>, &str>>) -> Self {
            let replies = replies
                .into_iter()
                .map(|r| {
                    r.map(|words| words.into_iter().map(String::from).collect())
                        .map_err(|msg| KeywordError::Request(msg.to_string()))
                })
                .collect();
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl KeywordExtractor for ScriptedKeywords {
        async fn keywords(&self, _text: &str) -> std::result::Result<Vec<String>, KeywordError> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(KeywordError::Request("unscripted call".into())))
        }
    }

    /// Records the order of stages it is told about.
    #[derive(Default)]
    struct StageLog(Mutex<Vec<Stage>>);

    impl ProgressReporter for StageLog {
        fn stage(&self, stage: Stage) {
            self.0.lock().unwrap().push(stage);
        }
        fn sentence_annotated(&self, _current: usize, _total: usize) {}
        fn done(&self, _report: &RunReport) {}
    }

    fn pipeline<'a>(
        store: &'a dyn DocumentStore,
        content: &'a dyn ContentSource,
        keywords: &'a dyn KeywordExtractor,
    ) -> Pipeline<'a> {
        Pipeline {
            store,
            content,
            boundary: &RuleBasedBoundary,
            keywords,
            timeouts: TIMEOUTS,
        }
    }

    const FORMULA_ONE: &str = "=Header\n\nCar racing (since 1950) is popular.\nIt is fast.";

    #[test]
    fn stages_run_in_fixed_order() {
        let names: Vec<_> = Stage::ALL.iter().map(Stage::as_str).collect();
        assert_eq!(
            names,
            vec!["fetch_content", "sanitize", "segment", "limit", "annotate"]
        );
    }

    #[tokio::test]
    async fn end_to_end_persists_annotated_sentences() {
        let store = MemoryStore::with_document(KEY, Document::new("Formula 1", 2));
        let content = FixedContent::ok(FORMULA_ONE);
        let keywords = ScriptedKeywords::new(vec![Ok(vec!["racing"]), Ok(vec!["speed"])]);
        let progress = StageLog::default();

        let report = pipeline(&store, &content, &keywords)
            .run(KEY, &progress)
            .await
            .unwrap();

        let saved = store.get(KEY).unwrap();
        assert_eq!(saved.source_content_original, FORMULA_ONE);
        assert_eq!(
            saved.source_content_sanitized,
            "Car racing is popular. It is fast."
        );
        assert_eq!(
            saved.sentences,
            vec![
                Sentence {
                    text: "Car racing is popular.".into(),
                    keywords: vec!["racing".into()],
                    images: vec![],
                },
                Sentence {
                    text: "It is fast.".into(),
                    keywords: vec!["speed".into()],
                    images: vec![],
                },
            ]
        );

        assert_eq!(content.calls(), vec!["Formula 1"]);
        assert_eq!(store.save_count(), 1);
        assert_eq!(report.sentence_count, 2);
        assert_eq!(report.keyword_count, 2);
        assert_eq!(*progress.0.lock().unwrap(), Stage::ALL.to_vec());
    }

    #[tokio::test]
    async fn limit_caps_sentences_before_annotation() {
        let store = MemoryStore::with_document(KEY, Document::new("Formula 1", 1));
        let content = FixedContent::ok(FORMULA_ONE);
        let keywords = ScriptedKeywords::new(vec![Ok(vec!["racing"])]);

        pipeline(&store, &content, &keywords)
            .run(KEY, &SilentProgress)
            .await
            .unwrap();

        let saved = store.get(KEY).unwrap();
        assert_eq!(saved.sentences.len(), 1);
        assert_eq!(keywords.calls(), 1);
    }

    #[tokio::test]
    async fn zero_maximum_makes_no_keyword_calls() {
        let store = MemoryStore::with_document(KEY, Document::new("Formula 1", 0));
        let content = FixedContent::ok(FORMULA_ONE);
        let keywords = ScriptedKeywords::new(vec![]);

        let report = pipeline(&store, &content, &keywords)
            .run(KEY, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.sentence_count, 0);
        assert_eq!(keywords.calls(), 0);
        assert!(store.get(KEY).unwrap().sentences.is_empty());
    }

    #[tokio::test]
    async fn markup_only_content_yields_no_sentences() {
        let store = MemoryStore::with_document(KEY, Document::new("Empty", 5));
        let content = FixedContent::ok("== Only ==\n\n=== Headings ===\n");
        let keywords = ScriptedKeywords::new(vec![]);

        pipeline(&store, &content, &keywords)
            .run(KEY, &SilentProgress)
            .await
            .unwrap();

        let saved = store.get(KEY).unwrap();
        assert_eq!(saved.source_content_sanitized, "");
        assert!(saved.sentences.is_empty());
    }

    #[tokio::test]
    async fn annotation_failure_saves_nothing() {
        let mut previous = Document::new("Formula 1", 3);
        previous.sentences = vec![Sentence::new("Earlier run.")];
        let store = MemoryStore::with_document(KEY, previous.clone());

        let content = FixedContent::ok("One is here. Two is here. Three is here.");
        let keywords = ScriptedKeywords::new(vec![Ok(vec!["a", "b"]), Err("service down")]);

        let err = pipeline(&store, &content, &keywords)
            .run(KEY, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::RemoteAnnotation { index: 1, .. }));
        assert_eq!(keywords.calls(), 2);
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.get(KEY).unwrap(), previous);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_before_annotation() {
        let store = MemoryStore::with_document(KEY, Document::new("Qwxzv", 3));
        let content = FixedContent::failing("no article found");
        let keywords = ScriptedKeywords::new(vec![]);

        let err = pipeline(&store, &content, &keywords)
            .run(KEY, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::RemoteFetch(_)));
        assert_eq!(keywords.calls(), 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let store = MemoryStore::with_document(KEY, Document::new("Rust", 3));
        let content = FixedContent {
            delay: Duration::from_secs(30),
            ..FixedContent::ok("Never delivered.")
        };
        let keywords = ScriptedKeywords::new(vec![]);

        let mut p = pipeline(&store, &content, &keywords);
        p.timeouts.content = Duration::from_millis(50);

        let err = p.run(KEY, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, NarratorError::RemoteFetch(_)));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn malformed_document_fails_before_any_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(KEY), r#"{"searchTerm": "Rust"}"#).unwrap();
        let store = JsonFileStore::new(dir.path());

        let content = FixedContent::ok(FORMULA_ONE);
        let keywords = ScriptedKeywords::new(vec![]);

        let err = pipeline(&store, &content, &keywords)
            .run(KEY, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, NarratorError::MalformedDocument { .. }));
        assert!(content.calls().is_empty());
        assert_eq!(keywords.calls(), 0);
    }

    #[tokio::test]
    async fn json_file_roundtrip_keeps_foreign_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(KEY),
            r#"{"searchTerm": "Formula 1", "maximumSentences": 2, "prefix": "The history of"}"#,
        )
        .unwrap();
        let store = JsonFileStore::new(dir.path());

        let content = FixedContent::ok(FORMULA_ONE);
        let keywords = ScriptedKeywords::new(vec![Ok(vec!["racing"]), Ok(vec!["speed"])]);

        pipeline(&store, &content, &keywords)
            .run(KEY, &SilentProgress)
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(KEY)).unwrap()).unwrap();
        assert_eq!(raw["prefix"], "The history of");
        assert_eq!(raw["sentences"][1]["keywords"], serde_json::json!(["speed"]));
        assert_eq!(raw["sentences"][0]["images"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn run_stage_touches_only_its_own_field() {
        let store = MemoryStore::new();
        let content = FixedContent::ok(FORMULA_ONE);
        let keywords = ScriptedKeywords::new(vec![]);
        let p = pipeline(&store, &content, &keywords);

        let mut doc = Document::new("Formula 1", 2);
        doc.source_content_original = "Raw (x) text.".into();

        p.run_stage(Stage::Sanitize, &mut doc, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(doc.source_content_original, "Raw (x) text.");
        assert_eq!(doc.source_content_sanitized, "Raw text.");
        assert!(doc.sentences.is_empty());
        assert!(content.calls().is_empty());
    }
}
