//! Remote resource metadata
//!
//! A [`FileHead`] is what the crawler and downloader learn about one URL from
//! the headers of a HEAD or GET response. It is the unit handed to the catalog
//! writer and upserted into the `fileindex` table.

use crate::url::{url_to_domain, url_to_filename};
use chrono::{NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};

/// Format servers use in the `Last-Modified` header (RFC 7231 IMF-fixdate)
pub const LAST_MODIFIED_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Metadata observed for a single remote file
#[derive(Debug, Clone, PartialEq)]
pub struct FileHead {
    /// Absolute URL of the resource
    pub url: String,

    /// Percent-decoded last path segment
    pub name: String,

    /// Host portion of the URL
    pub domain: String,

    /// HTTP status of the response, if a request was made
    pub status: Option<u16>,

    /// Content-Type header value (empty when absent)
    pub content_type: String,

    /// Content-Length header value (zero when absent)
    pub content_length: u64,

    /// Parsed Last-Modified header
    pub last_modified: Option<NaiveDateTime>,

    /// When this head was observed (UTC)
    pub last_indexed: NaiveDateTime,
}

impl FileHead {
    /// Creates a head carrying only what can be derived from the URL itself
    ///
    /// Used by quick triage, which never contacts the server.
    pub fn bare(url: &str) -> Self {
        Self {
            url: url.to_string(),
            name: url_to_filename(url),
            domain: url_to_domain(url).unwrap_or_default(),
            status: None,
            content_type: String::new(),
            content_length: 0,
            last_modified: None,
            last_indexed: Utc::now().naive_utc(),
        }
    }

    /// Builds a head from a response status and its headers
    pub fn from_headers(url: &str, status: u16, headers: &HeaderMap) -> Self {
        let content_type = header_str(headers, CONTENT_TYPE)
            .unwrap_or("")
            .to_string();
        let content_length = header_str(headers, CONTENT_LENGTH)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let last_modified = header_str(headers, LAST_MODIFIED).and_then(parse_http_date);

        Self {
            status: Some(status),
            content_type,
            content_length,
            last_modified,
            ..Self::bare(url)
        }
    }

    /// Returns true if the resource is an HTML page
    pub fn is_html(&self) -> bool {
        self.content_type.starts_with("text/html")
    }

    /// Returns true if this looks like a generated directory listing
    ///
    /// Listings are HTML and carry no `Last-Modified` date; static HTML files
    /// served from disk do.
    pub fn is_listing(&self) -> bool {
        self.is_html() && self.last_modified.is_none()
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Parses an HTTP date header, returning `None` for anything malformed
pub fn parse_http_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), LAST_MODIFIED_FORMAT).ok()
}
