use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for opendir-dl
///
/// Every section has defaults, so an empty or missing file is a valid
/// configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub catalog: CatalogConfig,
    #[serde(rename = "profile")]
    pub profiles: Vec<ProfileEntry>,

    /// Directory the configuration file was loaded from
    ///
    /// Relative profile resources are resolved against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    pub workers: usize,

    /// Classify links by their trailing slash instead of issuing HEAD requests
    pub quick: bool,

    /// Maximum link depth below the seeds (unlimited when absent)
    #[serde(rename = "max-depth")]
    pub max_depth: Option<u32>,

    /// How often the controller checks whether the crawl has drained (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// How long an idle worker waits on the frontier before re-checking (milliseconds)
    #[serde(rename = "dequeue-timeout-ms")]
    pub dequeue_timeout_ms: u64,

    /// Maximum number of catalog writes committed in one transaction
    #[serde(rename = "write-batch-size")]
    pub write_batch_size: usize,

    /// Number of times a HEAD request is retried after a connection failure
    #[serde(rename = "head-retries")]
    pub head_retries: u32,

    /// Delay before the first HEAD retry, doubled on each attempt (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            quick: false,
            max_depth: None,
            poll_interval_ms: 1000,
            dequeue_timeout_ms: 100,
            write_batch_size: 64,
            head_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds (no timeout when absent)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,

    /// Skip TLS certificate validation
    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("opendir-dl/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: None,
            accept_invalid_certs: false,
        }
    }
}

/// How existing catalog rows are matched when a file is seen again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupMode {
    /// Name and URL must be equal
    #[default]
    Exact,

    /// Name and URL only need to contain the new values
    Substring,
}

/// Catalog location and download configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path of the catalog used when no other is named
    #[serde(rename = "default-path")]
    pub default_path: String,

    /// Row matching mode used by upserts
    pub dedup: DedupMode,

    /// Directory downloaded files are written to
    #[serde(rename = "output-dir")]
    pub output_dir: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let default_path = dirs::data_dir()
            .map(|dir| dir.join("opendir-dl").join("default.db"))
            .unwrap_or_else(|| PathBuf::from("default.db"));

        Self {
            default_path: default_path.to_string_lossy().into_owned(),
            dedup: DedupMode::Exact,
            output_dir: ".".to_string(),
        }
    }
}

/// A named catalog
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEntry {
    /// Name used on the command line (`--db NAME`)
    pub name: String,

    /// Path or URL of the catalog
    pub resource: String,
}

impl Config {
    /// Looks up a profile by name
    pub fn profile(&self, name: &str) -> Option<&ProfileEntry> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Returns the location of a named catalog
    ///
    /// `default` names the configured default catalog. Relative paths in
    /// profiles are resolved against the configuration file's directory;
    /// URLs are returned unchanged.
    pub fn profile_resource(&self, name: &str) -> Option<String> {
        if name == "default" {
            return Some(self.catalog.default_path.clone());
        }

        let entry = self.profile(name)?;
        if crate::url::is_url(&entry.resource) {
            return Some(entry.resource.clone());
        }

        let expanded = shellexpand::tilde(&entry.resource).into_owned();
        let path = PathBuf::from(&expanded);
        match (&self.base_dir, path.is_relative()) {
            (Some(base), true) => Some(base.join(path).to_string_lossy().into_owned()),
            _ => Some(expanded),
        }
    }
}
