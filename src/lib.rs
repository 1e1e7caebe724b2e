//! opendir-dl: an open directory indexer
//!
//! This crate crawls "open directory" web servers (plain autoindex listings),
//! records the files it finds in a local SQLite catalog, and can search that
//! catalog or download the files it references.

pub mod config;
pub mod crawler;
pub mod download;
pub mod head;
pub mod output;
pub mod search;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for opendir-dl operations
#[derive(Debug, Error)]
pub enum OpendirError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("No results found for index '{id}' in database '{database}'.")]
    IndexNotFound { id: i64, database: String },

    #[error("{0}")]
    CatalogNotFound(String),

    #[error("HTTP GET request for database {url} failed with status {status}. Expected 2xx.")]
    CatalogFetch { url: String, status: u16 },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

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
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for opendir-dl operations
pub type Result<T> = std::result::Result<T, OpendirError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::head::FileHead;
pub use crate::state::WorkerState;
pub use crate::url::{bad_anchor, is_url, parse_item, url_to_domain, url_to_filename, Item};
