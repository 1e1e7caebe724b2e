//! File downloads
//!
//! Downloads files named by URL or catalog index into a local directory and,
//! unless told otherwise, records each successful download in the catalog.
//! Items are processed one at a time.

use crate::head::FileHead;
use crate::search::SearchEngine;
use crate::storage::{Storage, StorageError, UpsertOutcome};
use crate::url::{parse_item, url_to_filename, Item, DEFAULT_FILENAME};
use crate::{OpendirError, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Download settings
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory files are written to
    pub output_dir: PathBuf,

    /// Skip writing catalog rows for downloaded files
    pub no_index: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            no_index: false,
        }
    }
}

/// Summary of a download session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Files written to disk
    pub files: Vec<PathBuf>,
    /// Total bytes written
    pub bytes: u64,
    /// URLs that answered with an error or could not be reached
    pub failed: u64,
    /// Items that were neither a URL nor a catalog index
    pub skipped: u64,
}

impl DownloadReport {
    /// Number of files downloaded
    pub fn downloaded(&self) -> usize {
        self.files.len()
    }
}

/// Downloads files and keeps the catalog up to date
pub struct DownloadManager<'a> {
    client: Client,
    storage: &'a mut dyn Storage,
    options: DownloadOptions,
}

impl<'a> DownloadManager<'a> {
    /// Creates a download manager
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for GET requests
    /// * `storage` - Catalog used to resolve indexes and record downloads
    /// * `options` - Output directory and indexing switch
    pub fn new(client: Client, storage: &'a mut dyn Storage, options: DownloadOptions) -> Self {
        Self {
            client,
            storage,
            options,
        }
    }

    /// Downloads every item in order
    ///
    /// Items are URLs or catalog indexes. Anything else is logged and
    /// skipped, as are URLs that fail to download.
    ///
    /// # Errors
    ///
    /// * `IndexNotFound` - an index is not in the catalog; items after it
    ///   are not processed
    /// * `Io` - a file could not be written
    pub async fn start<S: AsRef<str>>(&mut self, items: &[S]) -> Result<DownloadReport> {
        let mut report = DownloadReport::default();

        for item in items {
            let item = item.as_ref();
            match parse_item(item) {
                Some(Item::Url(url)) => self.download_url(&url, &mut report).await?,
                Some(Item::Id(id)) => self.download_id(id, &mut report).await?,
                None => {
                    warn!(item, "Not a URL or catalog index, skipping");
                    report.skipped += 1;
                }
            }
        }

        info!(
            downloaded = report.downloaded(),
            failed = report.failed,
            skipped = report.skipped,
            bytes = report.bytes,
            "Downloads finished"
        );

        Ok(report)
    }

    /// Downloads every file a search matches
    pub async fn download_matches(&mut self, engine: &SearchEngine) -> Result<DownloadReport> {
        let records = engine.query(&*self.storage)?;
        info!(matches = records.len(), "Downloading search results");

        let urls: Vec<String> = records.into_iter().map(|record| record.url).collect();
        self.start(&urls).await
    }

    async fn download_id(&mut self, id: i64, report: &mut DownloadReport) -> Result<()> {
        let record = self
            .storage
            .get_file(id)?
            .ok_or_else(|| OpendirError::IndexNotFound {
                id,
                database: self.storage.source().to_string(),
            })?;

        debug!(id, url = %record.url, "Resolved catalog index");
        self.download_url(&record.url, report).await
    }

    async fn download_url(&mut self, url: &str, report: &mut DownloadReport) -> Result<()> {
        let mut response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, "Failed to download file: {}", e);
                report.failed += 1;
                return Ok(());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Failed to download file");
            report.failed += 1;
            return Ok(());
        }

        let head = FileHead::from_headers(url, status.as_u16(), response.headers());

        tokio::fs::create_dir_all(&self.options.output_dir).await?;
        let filename = local_filename(url);
        let path = self.options.output_dir.join(&filename);
        let partial = self.options.output_dir.join(format!("{}.part", filename));

        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written: u64 = 0;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(url, "Download interrupted: {}", e);
                    drop(file);
                    remove_partial(&partial).await;
                    report.failed += 1;
                    return Ok(());
                }
            }
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&partial, &path).await?;

        info!(url, path = %path.display(), bytes = written, "Downloaded file");
        report.bytes += written;
        report.files.push(path);

        if !self.options.no_index {
            self.record(&head);
        }

        Ok(())
    }

    /// Writes the head of a downloaded file to the catalog
    fn record(&mut self, head: &FileHead) {
        match self.storage.upsert(head) {
            Ok(UpsertOutcome::Inserted(id)) => debug!(id, url = %head.url, "Indexed download"),
            Ok(UpsertOutcome::Updated(id)) => debug!(id, url = %head.url, "Refreshed index"),
            Err(StorageError::DuplicateEntries { name, url, rows }) => {
                error!(
                    name = %name,
                    url = %url,
                    rows = ?rows,
                    "Found {} catalog entries for one file, index not saved",
                    rows.len()
                );
            }
            Err(e) => warn!(url = %head.url, "Failed to index download: {}", e),
        }
    }
}

/// File name a URL is saved under
///
/// Path separators in the decoded name are replaced so the file always lands
/// inside the output directory.
pub fn local_filename(url: &str) -> String {
    let name = url_to_filename(url).replace(['/', '\\'], "_");
    match name.as_str() {
        "." | ".." => DEFAULT_FILENAME.to_string(),
        _ => name,
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), "Could not remove partial download: {}", e);
    }
}
