//! Document persistence for the Narrator pipeline.
//!
//! The pipeline only needs get/set over a [`Document`] addressed by a key.
//! [`JsonFileStore`] keeps each document as one pretty-printed JSON file
//! (the key is its path); [`MemoryStore`] keeps them in process.
//!
//! **Access rules:** one writer per key. A save replaces the whole file
//! atomically, so readers never observe a half-written document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use narrator_shared::{Document, NarratorError, Result};
use tracing::debug;

/// Blocking load/save of whole documents.
pub trait DocumentStore: Send + Sync {
    /// Load the document stored under `key`.
    ///
    /// Fails with [`NarratorError::MalformedDocument`] if the stored value
    /// lacks `searchTerm` or `maximumSentences`.
    fn load(&self, key: &str) -> Result<Document>;

    /// Replace the document stored under `key`.
    fn save(&self, key: &str, document: &Document) -> Result<()>;
}

// ---------------------------------------------------------------------------
// JSON files
// ---------------------------------------------------------------------------

/// Stores documents as JSON files. Relative keys resolve against `root`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File path backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let key = Path::new(key);
        if key.is_absolute() {
            key.to_path_buf()
        } else {
            self.root.join(key)
        }
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Document> {
        let path = self.path_for(key);
        let content = std::fs::read_to_string(&path).map_err(|e| NarratorError::io(&path, e))?;

        let document: Document = serde_json::from_str(&content)
            .map_err(|e| NarratorError::malformed(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), search_term = %document.search_term, "loaded document");
        Ok(document)
    }

    fn save(&self, key: &str, document: &Document) -> Result<()> {
        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| NarratorError::Storage(format!("JSON serialization failed: {e}")))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| NarratorError::io(&dir, e))?;

        let file_name = path
            .file_name()
            .ok_or_else(|| NarratorError::Storage(format!("not a file path: {}", path.display())))?;
        let temp = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

        // Write to temp file first, then swap it in
        std::fs::write(&temp, json).map_err(|e| NarratorError::io(&temp, e))?;
        std::fs::rename(&temp, &path).map_err(|e| NarratorError::io(&path, e))?;

        debug!(path = %path.display(), sentences = document.sentences.len(), "saved document");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Process-local store, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Document>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with one document.
    pub fn with_document(key: &str, document: Document) -> Self {
        let store = Self::new();
        store.lock_documents().insert(key.to_string(), document);
        store
    }

    /// Current value under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Document> {
        self.lock_documents().get(key).cloned()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_documents(&self) -> std::sync::MutexGuard<'_, HashMap<String, Document>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Document> {
        self.get(key)
            .ok_or_else(|| NarratorError::Storage(format!("no document stored under {key}")))
    }

    fn save(&self, key: &str, document: &Document) -> Result<()> {
        self.lock_documents().insert(key.to_string(), document.clone());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
