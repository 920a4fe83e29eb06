//! Encyclopedia content extraction.
//!
//! The pipeline only needs "search term in, plain text out". [`ContentSource`]
//! is that contract; [`Wikipedia`] fulfils it with the MediaWiki `extracts`
//! API, which returns the article body as plain text with `== Heading ==`
//! lines between sections.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use narrator_shared::{NarratorError, Result};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for content requests (MediaWiki asks clients to identify themselves).
const USER_AGENT: &str = concat!("Narrator/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Retrieves raw source text for a search term.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the text for `search_term`, giving up after `timeout`.
    ///
    /// Fails with [`NarratorError::RemoteFetch`] when the service errors,
    /// the term resolves to no content, or the call times out.
    async fn fetch(&self, search_term: &str, timeout: Duration) -> Result<String>;
}

// ---------------------------------------------------------------------------
// MediaWiki response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<Query>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

#[derive(Debug, Deserialize)]
struct Query {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    invalidreason: Option<String>,
    #[serde(default)]
    extract: Option<String>,
}

// ---------------------------------------------------------------------------
// Wikipedia client
// ---------------------------------------------------------------------------

/// [`ContentSource`] backed by a MediaWiki `api.php` endpoint.
#[derive(Debug, Clone)]
pub struct Wikipedia {
    client: Client,
    endpoint: Url,
}

impl Wikipedia {
    /// Build a client for the given `api.php` endpoint.
    pub fn new(endpoint: Url) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint,
        })
    }
}

#[async_trait]
impl ContentSource for Wikipedia {
    #[instrument(skip(self))]
    async fn fetch(&self, search_term: &str, timeout: Duration) -> Result<String> {
        info!(endpoint = %self.endpoint, "fetching article text");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("formatversion", "2"),
                ("titles", search_term),
            ])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| NarratorError::RemoteFetch(request_error(search_term, &e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarratorError::RemoteFetch(format!(
                "{search_term}: HTTP {status}"
            )));
        }

        let body: ApiResponse = response.json().await.map_err(|e| {
            NarratorError::RemoteFetch(format!("{search_term}: invalid response body: {e}"))
        })?;

        let text = extract_text(search_term, body)?;
        debug!(len = text.len(), "article text received");
        Ok(text)
    }
}

/// Build a reqwest client with appropriate settings.
fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| NarratorError::RemoteFetch(format!("failed to build HTTP client: {e}")))
}

fn request_error(search_term: &str, e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("{search_term}: request timed out")
    } else {
        format!("{search_term}: {e}")
    }
}

/// Pull the first page's extract out of a parsed response.
fn extract_text(search_term: &str, body: ApiResponse) -> Result<String> {
    if let Some(err) = body.error {
        return Err(NarratorError::RemoteFetch(format!(
            "{search_term}: {} ({})",
            err.info, err.code
        )));
    }

    let page = body
        .query
        .and_then(|q| q.pages.into_iter().next())
        .ok_or_else(|| NarratorError::RemoteFetch(format!("{search_term}: no pages returned")))?;

    if page.missing {
        return Err(NarratorError::RemoteFetch(format!(
            "no article found for \"{}\"",
            page.title
        )));
    }
    if page.invalid {
        let reason = page.invalidreason.unwrap_or_else(|| "invalid title".into());
        return Err(NarratorError::RemoteFetch(format!("{search_term}: {reason}")));
    }

    match page.extract {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(NarratorError::RemoteFetch(format!(
            "article \"{}\" has no text content",
            page.title
        ))),
    }
}
