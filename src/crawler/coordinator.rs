//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl engine that coordinates:
//! - Seed resolution and classification
//! - A fixed pool of fetch workers sharing one scheduler
//! - A single catalog writer committing heads in batches
//! - Termination once the scheduler drains, or on interrupt

use crate::config::CrawlerConfig;
use crate::crawler::classifier::{Classification, Classifier, TriageMode};
use crate::crawler::fetcher::{fetch_page, FetchResult, RetryPolicy};
use crate::crawler::parser::parse_links;
use crate::crawler::scheduler::{CrawlJob, EnqueueResult, Scheduler};
use crate::head::FileHead;
use crate::state::WorkerState;
use crate::storage::{SqliteStorage, Storage, StorageError, UpsertOutcome};
use crate::url::{parse_http_url, parse_item, Item};
use crate::Result;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// Summary of a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Listings fetched successfully
    pub pages_fetched: u64,
    /// Listings that could not be fetched
    pub pages_failed: u64,
    /// New catalog rows
    pub files_inserted: u64,
    /// Existing catalog rows refreshed
    pub files_updated: u64,
    /// Heads the catalog refused (duplicates, write errors)
    pub files_rejected: u64,
    /// Links dropped because their HEAD failed
    pub classify_failures: u64,
    /// True if the crawl stopped on an interrupt
    pub interrupted: bool,
}

#[derive(Default)]
struct CrawlStats {
    pages_fetched: AtomicU64,
    pages_failed: AtomicU64,
    files_inserted: AtomicU64,
    files_updated: AtomicU64,
    files_rejected: AtomicU64,
    classify_failures: AtomicU64,
}

impl CrawlStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn report(&self, interrupted: bool) -> CrawlReport {
        CrawlReport {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            files_inserted: self.files_inserted.load(Ordering::Relaxed),
            files_updated: self.files_updated.load(Ordering::Relaxed),
            files_rejected: self.files_rejected.load(Ordering::Relaxed),
            classify_failures: self.classify_failures.load(Ordering::Relaxed),
            interrupted,
        }
    }
}

/// Crawl engine
pub struct Crawler {
    config: CrawlerConfig,
    classifier: Classifier,
    client: Client,
    storage: Arc<Mutex<SqliteStorage>>,
    exit: Arc<AtomicBool>,
}

impl Crawler {
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler settings (workers, triage mode, depth, timings)
    /// * `client` - HTTP client used for GET and HEAD requests
    /// * `storage` - Catalog that discovered files are written to
    pub fn new(config: &CrawlerConfig, client: Client, storage: Arc<Mutex<SqliteStorage>>) -> Self {
        let classifier = Classifier::new(
            client.clone(),
            TriageMode::from_quick(config.quick),
            RetryPolicy::from_config(config),
        );

        Self {
            config: config.clone(),
            classifier,
            client,
            storage,
            exit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses an existing exit flag instead of a private one
    pub fn with_shutdown(mut self, exit: Arc<AtomicBool>) -> Self {
        self.exit = exit;
        self
    }

    /// Returns the flag that stops the crawl when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.exit.clone()
    }

    /// Runs a crawl from the given seeds
    ///
    /// Seeds may be URLs or catalog indexes. The crawl ends when no listing is
    /// queued and every worker is idle, or when the exit flag is set. In both
    /// cases every worker and the catalog writer are joined before returning,
    /// so everything that was discovered is committed.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Counters for the run
    /// * `Err(OpendirError)` - A background task panicked
    pub async fn run(&self, seeds: &[String]) -> Result<CrawlReport> {
        let start_time = Instant::now();
        let stats = Arc::new(CrawlStats::default());
        let scheduler = Arc::new(Scheduler::new(self.config.workers, self.config.max_depth));
        let stop = Arc::new(AtomicBool::new(false));

        info!(
            seeds = seeds.len(),
            workers = self.config.workers,
            mode = ?self.classifier.mode(),
            max_depth = ?self.config.max_depth,
            "Starting crawl"
        );

        let (catalog_tx, catalog_rx) = mpsc::unbounded_channel::<FileHead>();

        let writer = {
            let storage = self.storage.clone();
            let stats = stats.clone();
            let batch_size = self.config.write_batch_size;
            tokio::task::spawn_blocking(move || write_loop(catalog_rx, storage, batch_size, stats))
        };

        self.seed(seeds, &scheduler, &catalog_tx, &stats).await;

        let mut workers = JoinSet::new();
        for id in 0..self.config.workers {
            let worker = Worker {
                id,
                scheduler: scheduler.clone(),
                classifier: self.classifier.clone(),
                client: self.client.clone(),
                catalog_tx: catalog_tx.clone(),
                stats: stats.clone(),
                exit: self.exit.clone(),
                stop: stop.clone(),
                dequeue_timeout: Duration::from_millis(self.config.dequeue_timeout_ms),
            };
            workers.spawn(worker.run());
        }
        drop(catalog_tx);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if self.exit.load(Ordering::SeqCst) {
                info!("Interrupt received, stopping crawl");
                break;
            }
            if scheduler.is_drained() {
                debug!("Frontier drained and all workers idle");
                break;
            }

            debug!(
                queued = scheduler.frontier_size(),
                busy = scheduler.busy_workers(),
                fetched = stats.pages_fetched.load(Ordering::Relaxed),
                "Crawl progress"
            );
            tokio::time::sleep(poll_interval).await;
        }

        stop.store(true, Ordering::SeqCst);
        scheduler.wake_all();

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Crawl worker failed: {}", e);
            }
        }

        writer.await?;

        let report = stats.report(self.exit.load(Ordering::SeqCst));
        info!(
            pages = report.pages_fetched,
            failed = report.pages_failed,
            inserted = report.files_inserted,
            updated = report.files_updated,
            rejected = report.files_rejected,
            listings_seen = scheduler.seen_count(),
            "Crawl finished in {:?}",
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Resolves and classifies the seeds, one at a time
    async fn seed(
        &self,
        seeds: &[String],
        scheduler: &Scheduler,
        catalog_tx: &mpsc::UnboundedSender<FileHead>,
        stats: &CrawlStats,
    ) {
        for seed in seeds {
            if self.exit.load(Ordering::SeqCst) {
                break;
            }

            let url = match parse_item(seed) {
                Some(Item::Url(url)) => match parse_http_url(&url) {
                    Ok(_) => url,
                    Err(e) => {
                        error!(seed = %seed, "Cannot crawl seed: {}", e);
                        continue;
                    }
                },
                Some(Item::Id(id)) => match self.lookup(id) {
                    Some(url) => url,
                    None => continue,
                },
                None => {
                    error!(seed = %seed, "Not a URL or catalog index, skipping");
                    continue;
                }
            };

            match self.classifier.classify(&url).await {
                Ok(Classification::Recurse(url)) => {
                    scheduler.enqueue(CrawlJob::seed(url));
                }
                Ok(Classification::Catalog(head)) => {
                    if catalog_tx.send(head).is_err() {
                        error!("Catalog writer stopped, dropping seed {}", url);
                    }
                }
                Err(e) => {
                    warn!("Skipping seed: {}", e);
                    CrawlStats::bump(&stats.classify_failures);
                }
            }
        }
    }

    /// Looks up the URL of a catalog entry used as a seed
    fn lookup(&self, id: i64) -> Option<String> {
        let storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        match storage.get_file(id) {
            Ok(Some(record)) => Some(record.url),
            Ok(None) => {
                error!(
                    "No results found for index '{}' in database '{}'.",
                    id,
                    storage.source()
                );
                None
            }
            Err(e) => {
                error!(id, "Failed to look up seed: {}", e);
                None
            }
        }
    }
}

/// One fetch worker and everything it shares with the others
struct Worker {
    id: usize,
    scheduler: Arc<Scheduler>,
    classifier: Classifier,
    client: Client,
    catalog_tx: mpsc::UnboundedSender<FileHead>,
    stats: Arc<CrawlStats>,
    exit: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    dequeue_timeout: Duration,
}

impl Worker {
    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.exit.load(Ordering::SeqCst)
    }

    async fn run(self) {
        debug!(worker = self.id, "Worker started");

        while !self.should_stop() {
            let job = match self
                .scheduler
                .claim_timeout(self.id, self.dequeue_timeout)
                .await
            {
                Some(job) => job,
                None => continue,
            };

            self.process(&job).await;
            self.scheduler.release(self.id);
        }

        debug!(worker = self.id, "Worker stopped");
    }

    /// Fetches one listing and dispatches every link on it
    async fn process(&self, job: &CrawlJob) {
        debug!(worker = self.id, url = %job.url, depth = job.depth, "Fetching listing");

        let (final_url, body) = match fetch_page(&self.client, &job.url).await {
            FetchResult::Success { final_url, body } => (final_url, body),
            FetchResult::HttpError { status_code } => {
                warn!(url = %job.url, status = status_code, "Failed to fetch listing");
                CrawlStats::bump(&self.stats.pages_failed);
                return;
            }
            FetchResult::NetworkError { error } => {
                warn!(url = %job.url, "Failed to fetch listing: {}", error);
                CrawlStats::bump(&self.stats.pages_failed);
                return;
            }
        };
        CrawlStats::bump(&self.stats.pages_fetched);

        self.scheduler.set_state(self.id, WorkerState::ExtractingLinks);
        let base_url = match Url::parse(&final_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %final_url, "Unusable listing URL: {}", e);
                return;
            }
        };
        let links = parse_links(&base_url, &body);
        debug!(worker = self.id, url = %job.url, links = links.len(), "Extracted links");

        self.scheduler.set_state(self.id, WorkerState::Classifying);
        for link in links {
            if self.should_stop() {
                break;
            }

            if self.scheduler.has_seen(&link) {
                continue;
            }

            match self.classifier.classify(&link).await {
                Ok(Classification::Recurse(url)) => {
                    if self.scheduler.enqueue(job.child(url)) == EnqueueResult::Queued {
                        debug!(worker = self.id, url = %link, "Queued listing");
                    }
                }
                Ok(Classification::Catalog(head)) => {
                    if self.catalog_tx.send(head).is_err() {
                        error!("Catalog writer stopped, abandoning {}", job.url);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Skipping link: {}", e);
                    CrawlStats::bump(&self.stats.classify_failures);
                }
            }
        }
    }
}

/// Drains the catalog channel, committing up to `batch_size` heads per transaction
///
/// Returns once every sender is dropped and the remaining heads are written.
fn write_loop(
    mut catalog_rx: mpsc::UnboundedReceiver<FileHead>,
    storage: Arc<Mutex<SqliteStorage>>,
    batch_size: usize,
    stats: Arc<CrawlStats>,
) {
    let mut batch = Vec::with_capacity(batch_size);

    while let Some(head) = catalog_rx.blocking_recv() {
        batch.push(head);
        while batch.len() < batch_size {
            match catalog_rx.try_recv() {
                Ok(head) => batch.push(head),
                Err(_) => break,
            }
        }

        write_batch(&storage, &batch, &stats);
        batch.clear();
    }

    debug!("Catalog writer finished");
}

fn write_batch(storage: &Mutex<SqliteStorage>, batch: &[FileHead], stats: &CrawlStats) {
    let mut storage = storage.lock().unwrap_or_else(PoisonError::into_inner);

    let results = match storage.upsert_batch(batch) {
        Ok(results) => results,
        Err(e) => {
            error!(count = batch.len(), "Failed to commit catalog batch: {}", e);
            stats
                .files_rejected
                .fetch_add(batch.len() as u64, Ordering::Relaxed);
            return;
        }
    };

    for (head, result) in batch.iter().zip(results) {
        match result {
            Ok(UpsertOutcome::Inserted(id)) => {
                debug!(id, url = %head.url, "Cataloged new file");
                CrawlStats::bump(&stats.files_inserted);
            }
            Ok(UpsertOutcome::Updated(id)) => {
                debug!(id, url = %head.url, "Refreshed cataloged file");
                CrawlStats::bump(&stats.files_updated);
            }
            Err(StorageError::DuplicateEntries { name, url, rows }) => {
                error!(
                    name = %name,
                    url = %url,
                    rows = ?rows,
                    "Found {} catalog entries for one file, skipping update",
                    rows.len()
                );
                CrawlStats::bump(&stats.files_rejected);
            }
            Err(e) => {
                warn!(url = %head.url, "Failed to catalog file: {}", e);
                CrawlStats::bump(&stats.files_rejected);
            }
        }
    }
}
