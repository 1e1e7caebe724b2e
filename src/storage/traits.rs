//! Storage traits and error types
//!
//! This module defines the trait interface for catalog backends and
//! associated error types.

use crate::head::FileHead;
use crate::search::SearchQuery;
use crate::storage::{FileRecord, TagRecord, UpsertOutcome};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Found {} entries for name '{name}' and url '{url}': {rows:?}", rows.len())]
    DuplicateEntries {
        name: String,
        url: String,
        rows: Vec<i64>,
    },

    #[error("Catalog '{0}' is opened read-only")]
    NotWritable(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Tag already exists: {0}")]
    TagExists(String),

    #[error("File not found: {0}")]
    FileNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for catalog backend implementations
///
/// This trait defines every catalog operation the crawler, search engine and
/// downloader need. Implementations are used from one thread at a time; the
/// crawler shares one behind a mutex.
pub trait Storage {
    /// Human-readable location of the catalog, used in error messages
    fn source(&self) -> &str;

    // ===== File Index =====

    /// Records what was learned about a remote file
    ///
    /// Rows are matched on (name, url). No match inserts a row, one match
    /// updates it in place, and more than one match is reported as
    /// [`StorageError::DuplicateEntries`] without writing anything.
    fn upsert(&mut self, head: &FileHead) -> StorageResult<UpsertOutcome>;

    /// Upserts a batch of heads inside a single transaction
    ///
    /// # Returns
    ///
    /// One result per head, in input order. Only failures to open or commit
    /// the transaction are returned as the outer error.
    fn upsert_batch(
        &mut self,
        heads: &[FileHead],
    ) -> StorageResult<Vec<StorageResult<UpsertOutcome>>>;

    /// Gets a file by its catalog index
    fn get_file(&self, id: i64) -> StorageResult<Option<FileRecord>>;

    /// Gets every file in the catalog, ordered by index
    fn all_files(&self) -> StorageResult<Vec<FileRecord>>;

    /// Counts the files in the catalog
    fn count_files(&self) -> StorageResult<u64>;

    /// Gets the files matching a search query, ordered by index
    fn search_files(&self, query: &SearchQuery) -> StorageResult<Vec<FileRecord>>;

    // ===== Tags =====

    /// Creates a tag and returns its index
    fn create_tag(&mut self, name: &str) -> StorageResult<i64>;

    /// Deletes a tag and all of its associations
    fn delete_tag(&mut self, name: &str) -> StorageResult<()>;

    /// Associates a tag with a file
    ///
    /// Tagging a file twice is a no-op.
    fn tag_file(&mut self, tag: &str, file_id: i64) -> StorageResult<()>;

    /// Removes a tag from a file
    fn untag_file(&mut self, tag: &str, file_id: i64) -> StorageResult<()>;

    /// Gets every tag with the number of files carrying it
    fn list_tags(&self) -> StorageResult<Vec<TagRecord>>;

    // ===== Statistics =====

    /// Gets count of unique domains in the catalog
    fn count_unique_domains(&self) -> StorageResult<u64>;

    /// Gets the sum of all recorded content lengths
    fn total_content_length(&self) -> StorageResult<u64>;

    /// Gets file counts per domain, largest first
    fn get_domain_breakdown(&self) -> StorageResult<Vec<(String, u64)>>;
}
