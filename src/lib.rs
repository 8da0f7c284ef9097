//! Card-Harvest: a resumable trading-card catalog scraper
//!
//! This crate drives a rendering browser session through a JavaScript-heavy
//! card database, snapshots every list page and package page to disk, and turns
//! the snapshots into normalized card records with a chain of extraction
//! heuristics. Long jobs survive restarts: saved pages, the detail-fetch ledger
//! and the last started package are all persisted.

pub mod config;
pub mod crawler;
pub mod dedup;
pub mod extractor;
pub mod model;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

pub use crawler::{FetchError, SessionError};
pub use output::OutputError;
pub use storage::StorageError;

/// Main error type for Card-Harvest operations
#[derive(Debug, Error)]
pub enum CardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Browser session error: {0}")]
    Session(#[from] SessionError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Card-Harvest operations
pub type Result<T> = std::result::Result<T, CardError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use dedup::{Deduplicator, KeyStrategy};
pub use model::{CardRecord, DetailQueueItem, Schema};
