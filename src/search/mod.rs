//! Catalog search
//!
//! A search is a list of terms matched as case-insensitive substrings
//! against one column of the catalog. Exclusive searches (the default)
//! require every term to match; inclusive searches accept any.

use crate::storage::{FileRecord, Storage};
use crate::Result;
use tracing::debug;

/// Column a search term is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    /// The decoded file name
    #[default]
    Name,
    /// The full URL
    Url,
}

impl SearchField {
    /// Name of the catalog column holding this field
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Url => "url",
        }
    }
}

/// A search as handed to the catalog backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub field: SearchField,
    pub exclusive: bool,
}

/// Builds and runs searches against a catalog
#[derive(Debug, Clone)]
pub struct SearchEngine {
    query: SearchQuery,
}

impl SearchEngine {
    /// Creates an exclusive search on file names
    ///
    /// Blank terms are ignored. With no terms left the search matches every
    /// file.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms = terms
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.trim().is_empty())
            .collect();

        Self {
            query: SearchQuery {
                terms,
                field: SearchField::Name,
                exclusive: true,
            },
        }
    }

    /// Sets whether all terms (true) or any term (false) must match
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.query.exclusive = exclusive;
        self
    }

    /// Sets the column terms are matched against
    pub fn field(mut self, field: SearchField) -> Self {
        self.query.field = field;
        self
    }

    /// Runs the search
    ///
    /// # Returns
    ///
    /// The matching files ordered by catalog index.
    pub fn query(&self, storage: &dyn Storage) -> Result<Vec<FileRecord>> {
        debug!(
            terms = ?self.query.terms,
            field = self.query.field.column(),
            exclusive = self.query.exclusive,
            catalog = storage.source(),
            "Searching catalog"
        );
        Ok(storage.search_files(&self.query)?)
    }
}
