//! Crawler module for indexing open directories
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Link extraction from directory listings
//! - Link triage (listing or file)
//! - Frontier scheduling and termination detection
//! - Overall crawl coordination

mod classifier;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use classifier::{classify_quick, Classification, Classifier, ClassifyError, TriageMode};
pub use coordinator::{CrawlReport, Crawler};
pub use fetcher::{
    build_http_client, describe_error, fetch_page, head_with_retry, FetchResult, RetryPolicy,
};
pub use parser::parse_links;
pub use scheduler::{CrawlJob, EnqueueResult, Scheduler};

use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::Result;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Runs a complete crawl operation
///
/// This is the main entry point for indexing. It will:
/// 1. Build the HTTP client from the configuration
/// 2. Classify the seeds
/// 3. Fetch listings and triage their links with a pool of workers
/// 4. Write discovered files to the catalog
///
/// # Arguments
///
/// * `config` - The full configuration
/// * `storage` - Catalog that discovered files are written to
/// * `seeds` - URLs or catalog indexes to start from
/// * `exit` - Flag that interrupts the crawl when set
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed or was interrupted cleanly
/// * `Err(OpendirError)` - The client could not be built or a task failed
pub async fn crawl(
    config: &Config,
    storage: Arc<Mutex<SqliteStorage>>,
    seeds: &[String],
    exit: Arc<AtomicBool>,
) -> Result<CrawlReport> {
    let client = build_http_client(&config.http)?;
    let crawler = Crawler::new(&config.crawler, client, storage).with_shutdown(exit);
    crawler.run(seeds).await
}
