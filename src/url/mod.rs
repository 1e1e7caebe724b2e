//! URL handling module for opendir-dl
//!
//! This module provides the small URL helpers the crawler, downloader and
//! catalog resolver share: deciding whether a user-supplied string is a URL or
//! a catalog index, deriving file names and domains, and filtering the anchors
//! found on directory listings.

mod anchor;
mod domain;
mod filename;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use anchor::bad_anchor;
pub use domain::url_to_domain;
pub use filename::{url_to_filename, DEFAULT_FILENAME};

/// A user-supplied target: either a URL or the id of a catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// An absolute URL
    Url(String),
    /// The primary key of an existing catalog entry
    Id(i64),
}

/// Returns true if the candidate parses with a non-empty scheme, host and path
///
/// # Examples
///
/// ```
/// use opendir_dl::url::is_url;
///
/// assert!(is_url("http://localhost:9000/"));
/// assert!(is_url("ftp://localhost:9000/"));
/// assert!(!is_url(":/12/363p"));
/// assert!(!is_url("1235"));
/// ```
pub fn is_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => {
            !url.scheme().is_empty()
                && url.host_str().map_or(false, |h| !h.is_empty())
                && !url.path().is_empty()
        }
        Err(_) => false,
    }
}

/// Classifies a user-supplied target as a URL or a catalog index
///
/// Returns `None` for anything that is neither.
pub fn parse_item(candidate: &str) -> Option<Item> {
    let candidate = candidate.trim();
    if is_url(candidate) {
        return Some(Item::Url(candidate.to_string()));
    }
    if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_digit()) {
        return candidate.parse().ok().map(Item::Id);
    }
    None
}

/// Parses a URL the HTTP client can fetch
///
/// Only `http` and `https` URLs with a host are accepted.
pub fn parse_http_url(candidate: &str) -> UrlResult<Url> {
    let url = Url::parse(candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
