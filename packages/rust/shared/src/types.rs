//! Core domain types for the Narrator content document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The persisted pipeline state for one search term (`content.json`).
///
/// `searchTerm` and `maximumSentences` are inputs and must be present; the
/// remaining fields are filled in, left to right, by the pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Term looked up in the encyclopedia.
    pub search_term: String,
    /// Sentence cap. Zero or negative keeps no sentences.
    pub maximum_sentences: i64,
    /// Raw text as returned by the content service.
    #[serde(default)]
    pub source_content_original: String,
    /// Text after markup and parenthetical removal.
    #[serde(default)]
    pub source_content_sanitized: String,
    /// Segmented, truncated and annotated sentences.
    #[serde(default)]
    pub sentences: Vec<Sentence>,
    /// Fields owned by other stages, preserved verbatim across a load/save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Create a fresh input document with no derived content.
    pub fn new(search_term: impl Into<String>, maximum_sentences: i64) -> Self {
        Self {
            search_term: search_term.into(),
            maximum_sentences,
            source_content_original: String::new(),
            source_content_sanitized: String::new(),
            sentences: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Total number of keywords across all sentences.
    pub fn keyword_count(&self) -> usize {
        self.sentences.iter().map(|s| s.keywords.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Sentence
// ---------------------------------------------------------------------------

/// One unit of narrated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    /// Keywords in the order the extraction service ranked them.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Filled by the image stage; never touched here.
    #[serde(default)]
    pub images: Vec<String>,
}

impl Sentence {
    /// A freshly segmented sentence with no annotations.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keywords: Vec::new(),
            images: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_display_is_uuid() {
        let id = RunId::new();
        assert_eq!(id.to_string().len(), 36);
    }

    #[test]
    fn document_uses_camel_case_keys() {
        let mut doc = Document::new("Formula 1", 2);
        doc.sentences.push(Sentence::new("It is fast."));

        let json = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(json["searchTerm"], "Formula 1");
        assert_eq!(json["maximumSentences"], 2);
        assert_eq!(json["sourceContentOriginal"], "");
        assert_eq!(json["sentences"][0]["text"], "It is fast.");
        assert_eq!(json["sentences"][0]["keywords"], serde_json::json!([]));
        assert_eq!(json["sentences"][0]["images"], serde_json::json!([]));
    }

    #[test]
    fn document_inputs_only() {
        let doc: Document =
            serde_json::from_str(r#"{"searchTerm":"Rust","maximumSentences":7}"#)
                .expect("deserialize");
        assert_eq!(doc, Document::new("Rust", 7));
    }

    #[test]
    fn document_missing_input_is_rejected() {
        let err = serde_json::from_str::<Document>(r#"{"maximumSentences":7}"#).unwrap_err();
        assert!(err.to_string().contains("searchTerm"));
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let input = r#"{
            "searchTerm": "Rust",
            "maximumSentences": 1,
            "prefix": "What is",
            "downloadedImages": ["a.png"]
        }"#;
        let doc: Document = serde_json::from_str(input).expect("deserialize");
        assert_eq!(doc.extra["prefix"], "What is");

        let json = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(json["downloadedImages"], serde_json::json!(["a.png"]));
    }

    #[test]
    fn keyword_count_sums_sentences() {
        let mut doc = Document::new("x", 2);
        doc.sentences = vec![
            Sentence {
                text: "a".into(),
                keywords: vec!["k1".into(), "k2".into()],
                images: vec![],
            },
            Sentence {
                text: "b".into(),
                keywords: vec!["k3".into()],
                images: vec![],
            },
        ];
        assert_eq!(doc.keyword_count(), 3);
    }
}
