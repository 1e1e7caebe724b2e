//! Storage module for the file catalog
//!
//! This module handles all database operations, including:
//! - SQLite catalog initialization and schema management
//! - File upserts with (name, url) deduplication
//! - Search queries, tags and statistics
//! - Resolving a catalog from a profile name, URL or path

mod resolver;
mod schema;
mod sqlite;
mod traits;

pub use resolver::{open_catalog, resolve_profile, resolve_url, resolve_path, Resolution};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::NaiveDateTime;

/// Format used for timestamp columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Formats a timestamp the way catalog columns store it
pub fn to_db_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp column
///
/// Accepts the stored format with or without fractional seconds, and the
/// ISO 8601 `T` separator some tools write. Returns None if the value doesn't
/// match any of them.
pub fn from_db_timestamp(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
}

/// Represents a file in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub domain: String,
    pub content_type: String,
    pub content_length: u64,
    pub last_modified: Option<NaiveDateTime>,
    pub last_indexed: Option<NaiveDateTime>,
    pub tags: Vec<String>,
}

/// Represents a tag and how many files carry it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub file_count: u64,
}

/// What an upsert did to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was created with this index
    Inserted(i64),
    /// The existing row with this index was refreshed
    Updated(i64),
}

impl UpsertOutcome {
    /// Returns the index of the affected row
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }
}
