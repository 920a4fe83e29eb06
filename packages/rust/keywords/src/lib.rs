//! Keyword extraction for individual sentences.
//!
//! [`KeywordExtractor`] is the contract the annotator depends on. [`WatsonNlu`]
//! implements it against the IBM Watson Natural Language Understanding
//! `analyze` endpoint with only the `keywords` feature enabled.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use narrator_shared::{KeywordsConfig, NarratorError, Result};

/// User-Agent string for NLU requests.
const USER_AGENT: &str = concat!("Narrator/", env!("CARGO_PKG_VERSION"));

/// Longest error body excerpt kept in an error message.
const MAX_ERROR_EXCERPT: usize = 200;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Failure reported by a keyword extraction backend.
#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),

    /// No response within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Extracts keywords from a piece of text.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Keywords for `text`, most relevant first, exactly as the backend
    /// returned them.
    async fn keywords(&self, text: &str) -> std::result::Result<Vec<String>, KeywordError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /v1/analyze`.
#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    features: Features,
}

#[derive(Debug, Serialize)]
struct Features {
    keywords: KeywordOptions,
}

#[derive(Debug, Serialize)]
struct KeywordOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    keywords: Vec<Keyword>,
}

#[derive(Debug, Deserialize)]
struct Keyword {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// ---------------------------------------------------------------------------
// Watson NLU client
// ---------------------------------------------------------------------------

/// [`KeywordExtractor`] backed by Watson Natural Language Understanding.
#[derive(Clone)]
pub struct WatsonNlu {
    client: Client,
    analyze_url: Url,
    api_key: String,
    limit: Option<u32>,
    timeout: Duration,
}

impl WatsonNlu {
    /// Build a client from the `[keywords]` config section and an API key.
    pub fn new(config: &KeywordsConfig, api_key: impl Into<String>) -> Result<Self> {
        // Instance URLs end in the instance id; keep it when joining.
        let mut base = config.endpoint.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let mut analyze_url = base
            .join("v1/analyze")
            .map_err(|e| NarratorError::config(format!("invalid keywords endpoint: {e}")))?;
        analyze_url
            .query_pairs_mut()
            .append_pair("version", &config.version);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NarratorError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            analyze_url,
            api_key: api_key.into(),
            limit: config.limit,
            timeout: config.timeout(),
        })
    }

    /// Map a transport failure, keeping timeouts distinct. The request
    /// timeout can also fire while the body is still streaming in.
    fn transport_error(
        &self,
        e: reqwest::Error,
        otherwise: fn(String) -> KeywordError,
    ) -> KeywordError {
        if e.is_timeout() {
            KeywordError::Timeout(self.timeout)
        } else {
            otherwise(e.to_string())
        }
    }
}

#[async_trait]
impl KeywordExtractor for WatsonNlu {
    #[instrument(skip_all, fields(len = text.len()))]
    async fn keywords(&self, text: &str) -> std::result::Result<Vec<String>, KeywordError> {
        let request = AnalyzeRequest {
            text,
            features: Features {
                keywords: KeywordOptions { limit: self.limit },
            },
        };

        let response = self
            .client
            .post(self.analyze_url.clone())
            .basic_auth("apikey", Some(&self.api_key))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e, KeywordError::Request))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KeywordError::Service {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e, KeywordError::InvalidResponse))?;

        let keywords: Vec<String> = parsed.keywords.into_iter().map(|k| k.text).collect();
        debug!(count = keywords.len(), "keywords received");
        Ok(keywords)
    }
}

/// Prefer the service's own `error` field, falling back to a body excerpt.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.chars().take(MAX_ERROR_EXCERPT).collect(),
    }
}
