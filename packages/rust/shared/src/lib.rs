//! Shared types, error model, and configuration for Narrator.
//!
//! This crate is the foundation depended on by all other Narrator crates.
//! It provides:
//! - [`NarratorError`]: the unified error type
//! - Domain types ([`Document`], [`Sentence`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContentConfig, DefaultsConfig, KeywordsConfig, api_key, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{NarratorError, Result};
pub use types::{Document, RunId, Sentence};
