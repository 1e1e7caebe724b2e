//! Database schema definitions
//!
//! Table and column names match catalogs written by earlier releases of
//! opendir-dl, so old catalog files open unchanged.

/// SQL schema for the catalog
pub const SCHEMA_SQL: &str = r#"
-- One row per discovered or downloaded file
CREATE TABLE IF NOT EXISTS fileindex (
    pkid INTEGER NOT NULL PRIMARY KEY,
    url VARCHAR,
    name VARCHAR,
    domain VARCHAR,
    last_indexed DATETIME,
    content_type VARCHAR,
    last_modified DATETIME,
    content_length INTEGER
);

CREATE INDEX IF NOT EXISTS idx_fileindex_name_url ON fileindex(name, url);

-- User-defined labels
CREATE TABLE IF NOT EXISTS tags (
    pkid INTEGER NOT NULL PRIMARY KEY,
    name VARCHAR UNIQUE
);

-- Many-to-many link between files and tags
CREATE TABLE IF NOT EXISTS associations (
    left_pkid INTEGER REFERENCES fileindex(pkid),
    right_pkid INTEGER REFERENCES tags(pkid)
);

CREATE INDEX IF NOT EXISTS idx_associations_left ON associations(left_pkid);
CREATE INDEX IF NOT EXISTS idx_associations_right ON associations(right_pkid);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
