//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::config::DedupMode;
use crate::head::FileHead;
use crate::search::SearchQuery;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{from_db_timestamp, to_db_timestamp, FileRecord, TagRecord, UpsertOutcome};
use crate::OpendirError;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use tempfile::NamedTempFile;

/// SQL function folding text with Unicode lowercase rules
///
/// SQLite's own `lower()` and `LIKE` only fold ASCII letters.
const UNICODE_LOWER: &str = "unicode_lower";

const FILE_COLUMNS: &str =
    "pkid, url, name, domain, content_type, content_length, last_modified, last_indexed";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    source: String,
    dedup: DedupMode,
    read_only: bool,
    // Declared after `conn` so the connection closes before the file is removed
    _download: Option<NamedTempFile>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Missing parent directories are created and the schema is initialized
    /// if the file is new.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(OpendirError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, OpendirError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        register_functions(&conn)?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            source: path.display().to_string(),
            dedup: DedupMode::Exact,
            read_only: false,
            _download: None,
        })
    }

    /// Opens a catalog that was downloaded into a temporary file
    ///
    /// The catalog is query-only for the life of this storage, and the
    /// temporary file is deleted when the storage is dropped. The schema is
    /// left untouched.
    ///
    /// # Arguments
    ///
    /// * `file` - Temporary file holding the downloaded catalog
    /// * `source` - URL the catalog came from, used in messages
    pub fn from_download(file: NamedTempFile, source: &str) -> Result<Self, OpendirError> {
        let conn = Connection::open(file.path())?;
        conn.execute_batch("PRAGMA query_only = ON;")?;
        register_functions(&conn)?;

        // Fails with "file is not a database" for anything that isn't SQLite
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })?;

        Ok(Self {
            conn,
            source: source.to_string(),
            dedup: DedupMode::Exact,
            read_only: true,
            _download: Some(file),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, OpendirError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        register_functions(&conn)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            source: ":memory:".to_string(),
            dedup: DedupMode::Exact,
            read_only: false,
            _download: None,
        })
    }

    /// Sets how existing rows are matched on upsert
    pub fn with_dedup(mut self, dedup: DedupMode) -> Self {
        self.dedup = dedup;
        self
    }

    /// Returns true if writes are refused
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::NotWritable(self.source.clone()));
        }
        Ok(())
    }

    fn tags_for(&self, file_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT t.name FROM tags t
             JOIN associations a ON a.right_pkid = t.pkid
             WHERE a.left_pkid = ?1
             ORDER BY t.name",
        )?;

        let tags = stmt
            .query_map(params![file_id], |row| row.get::<_, Option<String>>(0))?
            .filter_map(|row| row.transpose())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    fn with_tags(&self, mut records: Vec<FileRecord>) -> StorageResult<Vec<FileRecord>> {
        for record in &mut records {
            record.tags = self.tags_for(record.id)?;
        }
        Ok(records)
    }

    fn tag_id(&self, name: &str) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT pkid FROM tags WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn require_tag(&self, name: &str) -> StorageResult<i64> {
        self.tag_id(name)?
            .ok_or_else(|| StorageError::TagNotFound(name.to_string()))
    }

    fn require_file(&self, file_id: i64) -> StorageResult<()> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM fileindex WHERE pkid = ?1",
                params![file_id],
                |_| Ok(()),
            )
            .optional()?;
        exists.ok_or(StorageError::FileNotFound(file_id))
    }
}

/// Escapes `%`, `_` and `\` so a term matches literally inside `LIKE ... ESCAPE '\'`
/// Registers the SQL functions search relies on
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(text) => Some(String::from_utf8_lossy(text).to_lowercase()),
                _ => None,
            })
        },
    )
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

fn row_to_record(row: &Row) -> rusqlite::Result<FileRecord> {
    let last_modified: Option<String> = row.get(6)?;
    let last_indexed: Option<String> = row.get(7)?;

    Ok(FileRecord {
        id: row.get(0)?,
        url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        domain: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        content_type: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        content_length: row.get::<_, Option<i64>>(5)?.unwrap_or(0).max(0) as u64,
        last_modified: last_modified.as_deref().and_then(from_db_timestamp),
        last_indexed: last_indexed.as_deref().and_then(from_db_timestamp),
        tags: Vec::new(),
    })
}

/// Finds the rows an upsert of (name, url) would touch
fn find_matches(conn: &Connection, dedup: DedupMode, name: &str, url: &str) -> StorageResult<Vec<i64>> {
    let (sql, name_param, url_param) = match dedup {
        DedupMode::Exact => (
            "SELECT pkid FROM fileindex WHERE name = ?1 AND url = ?2 ORDER BY pkid",
            name.to_string(),
            url.to_string(),
        ),
        DedupMode::Substring => (
            "SELECT pkid FROM fileindex
             WHERE name LIKE ?1 ESCAPE '\\' AND url LIKE ?2 ESCAPE '\\'
             ORDER BY pkid",
            contains_pattern(name),
            contains_pattern(url),
        ),
    };

    let mut stmt = conn.prepare_cached(sql)?;
    let ids = stmt
        .query_map(params![name_param, url_param], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;

    Ok(ids)
}

/// Inserts or refreshes the row for one head
///
/// Takes a bare connection so it can run inside a batch transaction.
fn upsert_on(conn: &Connection, dedup: DedupMode, head: &FileHead) -> StorageResult<UpsertOutcome> {
    let matches = find_matches(conn, dedup, &head.name, &head.url)?;

    let last_modified = head.last_modified.as_ref().map(to_db_timestamp);
    let last_indexed = to_db_timestamp(&head.last_indexed);
    let content_length = head.content_length as i64;

    match matches.as_slice() {
        [] => {
            conn.execute(
                "INSERT INTO fileindex
                 (url, name, domain, last_indexed, content_type, last_modified, content_length)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    head.url,
                    head.name,
                    head.domain,
                    last_indexed,
                    head.content_type,
                    last_modified,
                    content_length,
                ],
            )?;
            Ok(UpsertOutcome::Inserted(conn.last_insert_rowid()))
        }
        [id] => {
            conn.execute(
                "UPDATE fileindex
                 SET content_type = ?1, content_length = ?2, last_modified = ?3, last_indexed = ?4
                 WHERE pkid = ?5",
                params![head.content_type, content_length, last_modified, last_indexed, *id],
            )?;
            Ok(UpsertOutcome::Updated(*id))
        }
        _ => Err(StorageError::DuplicateEntries {
            name: head.name.clone(),
            url: head.url.clone(),
            rows: matches,
        }),
    }
}

impl Storage for SqliteStorage {
    fn source(&self) -> &str {
        &self.source
    }

    // ===== File Index =====

    fn upsert(&mut self, head: &FileHead) -> StorageResult<UpsertOutcome> {
        self.ensure_writable()?;
        upsert_on(&self.conn, self.dedup, head)
    }

    fn upsert_batch(
        &mut self,
        heads: &[FileHead],
    ) -> StorageResult<Vec<StorageResult<UpsertOutcome>>> {
        self.ensure_writable()?;

        let dedup = self.dedup;
        let tx = self.conn.transaction()?;
        let results = heads
            .iter()
            .map(|head| upsert_on(&tx, dedup, head))
            .collect();
        tx.commit()?;

        Ok(results)
    }

    fn get_file(&self, id: i64) -> StorageResult<Option<FileRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM fileindex WHERE pkid = ?1"),
                params![id],
                row_to_record,
            )
            .optional()?;

        match record {
            Some(mut record) => {
                record.tags = self.tags_for(record.id)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn all_files(&self) -> StorageResult<Vec<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FILE_COLUMNS} FROM fileindex ORDER BY pkid"))?;

        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        self.with_tags(records)
    }

    fn count_files(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fileindex", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn search_files(&self, query: &SearchQuery) -> StorageResult<Vec<FileRecord>> {
        if query.terms.is_empty() {
            return self.all_files();
        }

        let column = query.field.column();
        let joiner = if query.exclusive { " AND " } else { " OR " };
        let predicate = (1..=query.terms.len())
            .map(|i| format!("{UNICODE_LOWER}({column}) LIKE ?{i} ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(joiner);
        let patterns: Vec<String> = query
            .terms
            .iter()
            .map(|term| contains_pattern(&term.to_lowercase()))
            .collect();

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM fileindex WHERE {predicate} ORDER BY pkid"
        ))?;

        let records = stmt
            .query_map(params_from_iter(patterns.iter()), row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        self.with_tags(records)
    }

    // ===== Tags =====

    fn create_tag(&mut self, name: &str) -> StorageResult<i64> {
        self.ensure_writable()?;

        if self.tag_id(name)?.is_some() {
            return Err(StorageError::TagExists(name.to_string()));
        }

        self.conn
            .execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete_tag(&mut self, name: &str) -> StorageResult<()> {
        self.ensure_writable()?;
        let tag_id = self.require_tag(name)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM associations WHERE right_pkid = ?1",
            params![tag_id],
        )?;
        tx.execute("DELETE FROM tags WHERE pkid = ?1", params![tag_id])?;
        tx.commit()?;

        Ok(())
    }

    fn tag_file(&mut self, tag: &str, file_id: i64) -> StorageResult<()> {
        self.ensure_writable()?;
        let tag_id = self.require_tag(tag)?;
        self.require_file(file_id)?;

        let existing = self
            .conn
            .query_row(
                "SELECT 1 FROM associations WHERE left_pkid = ?1 AND right_pkid = ?2",
                params![file_id, tag_id],
                |_| Ok(()),
            )
            .optional()?;

        if existing.is_none() {
            self.conn.execute(
                "INSERT INTO associations (left_pkid, right_pkid) VALUES (?1, ?2)",
                params![file_id, tag_id],
            )?;
        }

        Ok(())
    }

    fn untag_file(&mut self, tag: &str, file_id: i64) -> StorageResult<()> {
        self.ensure_writable()?;
        let tag_id = self.require_tag(tag)?;

        self.conn.execute(
            "DELETE FROM associations WHERE left_pkid = ?1 AND right_pkid = ?2",
            params![file_id, tag_id],
        )?;
        Ok(())
    }

    fn list_tags(&self) -> StorageResult<Vec<TagRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.pkid, COALESCE(t.name, ''), COUNT(a.left_pkid)
             FROM tags t
             LEFT JOIN associations a ON a.right_pkid = t.pkid
             GROUP BY t.pkid
             ORDER BY t.name",
        )?;

        let tags = stmt
            .query_map([], |row| {
                Ok(TagRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    file_count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    // ===== Statistics =====

    fn count_unique_domains(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT domain) FROM fileindex",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn total_content_length(&self) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(content_length), 0) FROM fileindex",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    fn get_domain_breakdown(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(domain, ''), COUNT(*) AS files
             FROM fileindex
             GROUP BY domain
             ORDER BY files DESC, domain",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
