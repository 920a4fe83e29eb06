//! Application configuration for Narrator.
//!
//! User config lives at `~/.narrator/narrator.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{NarratorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "narrator.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".narrator";

// ---------------------------------------------------------------------------
// Config structs (matching narrator.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Content-extraction service settings.
    #[serde(default)]
    pub content: ContentConfig,

    /// Keyword-extraction service settings.
    #[serde(default)]
    pub keywords: KeywordsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Document path used when `--document` is not given.
    #[serde(default = "default_document_path")]
    pub document_path: String,

    /// Sentence cap written into new documents.
    #[serde(default = "default_maximum_sentences")]
    pub maximum_sentences: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            maximum_sentences: default_maximum_sentences(),
        }
    }
}

fn default_document_path() -> String {
    "content.json".into()
}
fn default_maximum_sentences() -> i64 {
    7
}

/// `[content]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// MediaWiki `api.php` endpoint.
    #[serde(default = "default_content_endpoint")]
    pub endpoint: Url,

    /// Upper bound on a single content fetch.
    #[serde(default = "default_content_timeout")]
    pub timeout_secs: u64,
}

impl ContentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_content_endpoint(),
            timeout_secs: default_content_timeout(),
        }
    }
}

fn default_content_endpoint() -> Url {
    Url::parse("https://en.wikipedia.org/w/api.php").expect("valid default URL")
}
fn default_content_timeout() -> u64 {
    300
}

/// `[keywords]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Base URL of the NLU service instance.
    #[serde(default = "default_keywords_endpoint")]
    pub endpoint: Url,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API version date sent with every request.
    #[serde(default = "default_version")]
    pub version: String,

    /// Upper bound on a single keyword request.
    #[serde(default = "default_keywords_timeout")]
    pub timeout_secs: u64,

    /// Maximum keywords returned per sentence (service default when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl KeywordsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_keywords_endpoint(),
            api_key_env: default_api_key_env(),
            version: default_version(),
            timeout_secs: default_keywords_timeout(),
            limit: None,
        }
    }
}

fn default_keywords_endpoint() -> Url {
    Url::parse("https://api.us-south.natural-language-understanding.watson.cloud.ibm.com")
        .expect("valid default URL")
}
fn default_api_key_env() -> String {
    "NARRATOR_NLU_API_KEY".into()
}
fn default_version() -> String {
    "2018-04-05".into()
}
fn default_keywords_timeout() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.narrator/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NarratorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.narrator/narrator.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NarratorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| NarratorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NarratorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NarratorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NarratorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the NLU API key from the env var named in the config.
pub fn api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.keywords.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(NarratorError::config(format!(
            "NLU API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("document_path"));
        assert!(toml_str.contains("NARRATOR_NLU_API_KEY"));
        assert!(!toml_str.contains("limit"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.maximum_sentences, 7);
        assert_eq!(parsed.content.timeout(), Duration::from_secs(300));
        assert_eq!(parsed.keywords.api_key_env, "NARRATOR_NLU_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[content]
endpoint = "https://de.wikipedia.org/w/api.php"

[keywords]
timeout_secs = 5
limit = 3
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.content.endpoint.host_str(), Some("de.wikipedia.org"));
        assert_eq!(config.content.timeout_secs, 300);
        assert_eq!(config.keywords.timeout(), Duration::from_secs(5));
        assert_eq!(config.keywords.limit, Some(3));
        assert_eq!(config.defaults.document_path, "content.json");
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("narrator.toml");
        std::fs::write(&path, "[content\nendpoint = 1").expect("write");

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, NarratorError::Config { .. }));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.keywords.api_key_env = "NARRATOR_TEST_NONEXISTENT_KEY_12345".into();
        let err = api_key(&config).unwrap_err();
        assert!(matches!(err, NarratorError::Config { .. }));
        assert!(err.to_string().contains("API key not found"));
    }
}
