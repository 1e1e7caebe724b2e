//! Configuration module for opendir-dl
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving named catalog profiles.
//!
//! # Example
//!
//! ```no_run
//! use opendir_dl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CatalogConfig, Config, CrawlerConfig, DedupMode, HttpConfig, ProfileEntry};

// Re-export parser functions
pub use parser::{
    compute_config_hash, default_config_path, load_config, load_config_with_hash,
    load_or_default,
};
pub use validation::validate;
