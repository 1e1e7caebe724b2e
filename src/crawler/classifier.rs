//! Link triage
//!
//! Every link found on a listing is either another listing to recurse into
//! or a file to record in the catalog. Standard triage asks the server with a
//! HEAD request; quick triage trusts the trailing slash and never touches the
//! network.

use crate::crawler::fetcher::{describe_error, head_with_retry, RetryPolicy};
use crate::head::FileHead;
use reqwest::Client;
use thiserror::Error;
use tracing::trace;

/// How links are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriageMode {
    /// HEAD every link and inspect its headers
    #[default]
    Standard,
    /// Treat links ending in `/` as listings and everything else as files
    Quick,
}

impl TriageMode {
    /// Picks the mode from the `quick` flag
    pub fn from_quick(quick: bool) -> Self {
        if quick {
            Self::Quick
        } else {
            Self::Standard
        }
    }
}

/// What to do with a link
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Fetch the URL and follow its links
    Recurse(String),
    /// Record the file in the catalog
    Catalog(FileHead),
}

/// Why a link could not be classified
///
/// These are per-link failures: the link is logged and dropped, the crawl
/// goes on.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("HEAD {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("HEAD {url} failed: {message}")]
    Network {
        url: String,
        message: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Classifies links using the configured triage mode
#[derive(Debug, Clone)]
pub struct Classifier {
    client: Client,
    mode: TriageMode,
    retry: RetryPolicy,
}

impl Classifier {
    /// Creates a classifier
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for HEAD requests
    /// * `mode` - Triage mode
    /// * `retry` - Retry policy for HEAD connection failures
    pub fn new(client: Client, mode: TriageMode, retry: RetryPolicy) -> Self {
        Self {
            client,
            mode,
            retry,
        }
    }

    /// Returns the triage mode in use
    pub fn mode(&self) -> TriageMode {
        self.mode
    }

    /// Classifies one URL
    pub async fn classify(&self, url: &str) -> Result<Classification, ClassifyError> {
        let classification = match self.mode {
            TriageMode::Standard => self.classify_standard(url).await?,
            TriageMode::Quick => classify_quick(url),
        };

        trace!(
            url,
            recurse = matches!(classification, Classification::Recurse(_)),
            "Classified link"
        );

        Ok(classification)
    }

    async fn classify_standard(&self, url: &str) -> Result<Classification, ClassifyError> {
        let response = head_with_retry(&self.client, url, &self.retry)
            .await
            .map_err(|source| ClassifyError::Network {
                url: url.to_string(),
                message: describe_error(&source),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let head = FileHead::from_headers(url, status.as_u16(), response.headers());

        if head.is_listing() {
            Ok(Classification::Recurse(url.to_string()))
        } else {
            Ok(Classification::Catalog(head))
        }
    }
}

/// Classifies a URL by its shape alone
pub fn classify_quick(url: &str) -> Classification {
    if url.ends_with('/') {
        Classification::Recurse(url.to_string())
    } else {
        Classification::Catalog(FileHead::bare(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_directory() {
        assert_eq!(
            classify_quick("http://example.com/pub/sub/"),
            Classification::Recurse("http://example.com/pub/sub/".to_string())
        );
    }

    #[test]
    fn test_quick_file_has_bare_head() {
        match classify_quick("http://example.com/pub/file.txt") {
            Classification::Catalog(head) => {
                assert_eq!(head.name, "file.txt");
                assert_eq!(head.status, None);
                assert_eq!(head.content_type, "");
                assert_eq!(head.content_length, 0);
            }
            other => panic!("expected a catalog entry, got {:?}", other),
        }
    }

    #[test]
    fn test_mode_from_quick() {
        assert_eq!(TriageMode::from_quick(true), TriageMode::Quick);
        assert_eq!(TriageMode::from_quick(false), TriageMode::Standard);
        assert_eq!(TriageMode::default(), TriageMode::Standard);
    }

    #[tokio::test]
    async fn test_quick_classifier_makes_no_requests() {
        // Nothing listens here; a request would fail
        let classifier = Classifier::new(Client::new(), TriageMode::Quick, RetryPolicy::none());
        let result = classifier.classify("http://127.0.0.1:9/listing/").await;
        assert!(matches!(result, Ok(Classification::Recurse(_))));
    }

    #[tokio::test]
    async fn test_standard_network_error() {
        let classifier =
            Classifier::new(Client::new(), TriageMode::Standard, RetryPolicy::none());
        let result = classifier.classify("http://127.0.0.1:9/file.txt").await;
        assert!(matches!(result, Err(ClassifyError::Network { .. })));
    }
}
