//! opendir-dl main entry point
//!
//! This is the command-line interface for the opendir-dl indexer.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use opendir_dl::config::{load_or_default, Config};
use opendir_dl::crawler::{build_http_client, crawl};
use opendir_dl::download::{DownloadManager, DownloadOptions};
use opendir_dl::output::{format_records, load_statistics, print_statistics};
use opendir_dl::search::{SearchEngine, SearchField};
use opendir_dl::storage::{open_catalog, SqliteStorage, Storage};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::EnvFilter;

/// opendir-dl: an open directory indexer
///
/// Crawls plain autoindex listings, keeps a SQLite catalog of the files it
/// finds, and searches or downloads from that catalog.
#[derive(Parser, Debug)]
#[command(name = "opendir-dl")]
#[command(version)]
#[command(about = "Index, search and download from open directories", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Catalog selection shared by every command
#[derive(Args, Debug)]
struct CatalogArg {
    /// Profile name, URL or path of the catalog
    #[arg(long, value_name = "DB", default_value = "default")]
    db: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl open directories and record their files
    Index {
        /// Classify links by their trailing slash instead of HEAD requests
        #[arg(long)]
        quick: bool,

        /// Maximum link depth below the targets
        #[arg(long, value_name = "N")]
        depth: Option<u32>,

        /// Number of concurrent fetch workers
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        #[command(flatten)]
        catalog: CatalogArg,

        /// URLs or catalog indexes to start from
        #[arg(required = true, value_name = "TARGETS")]
        targets: Vec<String>,
    },

    /// Search the catalog by file name
    Search {
        /// Match any term instead of all of them
        #[arg(long)]
        inclusive: bool,

        /// Match terms against the URL instead of the file name
        #[arg(long)]
        url: bool,

        #[command(flatten)]
        catalog: CatalogArg,

        /// Search terms
        #[arg(value_name = "TERMS")]
        terms: Vec<String>,
    },

    /// Download files by URL, catalog index or search
    Download {
        /// Don't record downloaded files in the catalog
        #[arg(long)]
        no_index: bool,

        /// Treat the items as search terms and download every match
        #[arg(long)]
        search: bool,

        /// With --search, match any term instead of all of them
        #[arg(long, requires = "search")]
        inclusive: bool,

        #[command(flatten)]
        catalog: CatalogArg,

        /// Directory files are written to
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// URLs, catalog indexes, or search terms
        #[arg(required = true, value_name = "ITEMS")]
        items: Vec<String>,
    },

    /// Manage tags
    Tag {
        #[command(subcommand)]
        action: TagAction,

        #[command(flatten)]
        catalog: CatalogArg,
    },

    /// Show statistics for a catalog
    Stats {
        #[command(flatten)]
        catalog: CatalogArg,
    },
}

#[derive(Subcommand, Debug)]
enum TagAction {
    /// Create a tag
    Create { name: String },
    /// Delete a tag and its associations
    Delete { name: String },
    /// Tag catalog entries
    Add {
        name: String,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Remove a tag from catalog entries
    Remove {
        name: String,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// List tags and how many files carry them
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, hash) =
        load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    match hash {
        Some(hash) => tracing::debug!("Configuration loaded (hash: {})", hash),
        None => tracing::debug!("No configuration file, using defaults"),
    }

    match cli.command {
        Command::Index {
            quick,
            depth,
            workers,
            catalog,
            targets,
        } => handle_index(config, quick, depth, workers, &catalog.db, &targets).await,
        Command::Search {
            inclusive,
            url,
            catalog,
            terms,
        } => handle_search(&config, inclusive, url, &catalog.db, &terms).await,
        Command::Download {
            no_index,
            search,
            inclusive,
            catalog,
            output,
            items,
        } => {
            let options = DownloadOptions {
                output_dir: output.unwrap_or_else(|| PathBuf::from(&config.catalog.output_dir)),
                no_index,
            };
            handle_download(&config, options, search, inclusive, &catalog.db, &items).await
        }
        Command::Tag { action, catalog } => handle_tag(&config, action, &catalog.db).await,
        Command::Stats { catalog } => handle_stats(&config, &catalog.db).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("opendir_dl=info,warn"),
            1 => EnvFilter::new("opendir_dl=debug,info"),
            2 => EnvFilter::new("opendir_dl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn open(config: &Config, reference: &str) -> Result<SqliteStorage> {
    let client = build_http_client(&config.http).context("Failed to build HTTP client")?;
    let storage = open_catalog(config, &client, reference).await?;
    tracing::debug!("Using catalog {}", storage.source());
    Ok(storage)
}

/// Handles `index`: crawls the targets into the catalog
async fn handle_index(
    mut config: Config,
    quick: bool,
    depth: Option<u32>,
    workers: Option<usize>,
    reference: &str,
    targets: &[String],
) -> Result<()> {
    config.crawler.quick |= quick;
    if depth.is_some() {
        config.crawler.max_depth = depth;
    }
    if let Some(workers) = workers {
        config.crawler.workers = workers;
    }
    opendir_dl::config::validate(&config).context("Invalid crawler options")?;

    let storage = open(&config, reference).await?;
    if storage.is_read_only() {
        bail!("Catalog {} was fetched over HTTP and cannot be written to", storage.source());
    }

    let exit = Arc::new(AtomicBool::new(false));
    {
        let exit = exit.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing queued catalog writes");
                exit.store(true, Ordering::SeqCst);
            }
        });
    }

    tracing::info!(
        targets = targets.len(),
        workers = config.crawler.workers,
        quick = config.crawler.quick,
        "Starting crawl"
    );

    let storage = Arc::new(Mutex::new(storage));
    let report = crawl(&config, storage.clone(), targets, exit)
        .await
        .context("Crawl failed")?;

    let total = storage
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .count_files()?;

    println!(
        "Fetched {} listings ({} failed). {} new files, {} updated, {} catalog entries total.",
        report.pages_fetched,
        report.pages_failed,
        report.files_inserted,
        report.files_updated,
        total
    );
    if report.interrupted {
        println!("Crawl was interrupted before the frontier drained.");
    }

    Ok(())
}

/// Handles `search`: prints matching catalog entries
async fn handle_search(
    config: &Config,
    inclusive: bool,
    url: bool,
    reference: &str,
    terms: &[String],
) -> Result<()> {
    let storage = open(config, reference).await?;
    let field = if url { SearchField::Url } else { SearchField::Name };
    let engine = SearchEngine::new(terms).exclusive(!inclusive).field(field);

    let records = engine.query(&storage)?;
    print!("{}", format_records(&records));
    println!("{} results", records.len());

    Ok(())
}

/// Handles `download`: fetches files by URL, index or search
async fn handle_download(
    config: &Config,
    options: DownloadOptions,
    search: bool,
    inclusive: bool,
    reference: &str,
    items: &[String],
) -> Result<()> {
    let client = build_http_client(&config.http).context("Failed to build HTTP client")?;
    let mut storage = open(config, reference).await?;
    let output_dir = options.output_dir.clone();
    let mut manager = DownloadManager::new(client, &mut storage, options);

    let report = if search {
        let engine = SearchEngine::new(items).exclusive(!inclusive);
        manager.download_matches(&engine).await?
    } else {
        manager.start(items).await?
    };

    println!(
        "Downloaded {} files ({} bytes) to {}. {} failed, {} skipped.",
        report.downloaded(),
        report.bytes,
        output_dir.display(),
        report.failed,
        report.skipped
    );

    Ok(())
}

/// Handles `tag`: creates, deletes, applies and lists tags
async fn handle_tag(config: &Config, action: TagAction, reference: &str) -> Result<()> {
    let mut storage = open(config, reference).await?;

    match action {
        TagAction::Create { name } => {
            storage
                .create_tag(&name)
                .with_context(|| format!("Failed to create tag '{}'", name))?;
            println!("Created tag '{}'", name);
        }
        TagAction::Delete { name } => {
            storage
                .delete_tag(&name)
                .with_context(|| format!("Failed to delete tag '{}'", name))?;
            println!("Deleted tag '{}'", name);
        }
        TagAction::Add { name, ids } => {
            for id in &ids {
                storage
                    .tag_file(&name, *id)
                    .with_context(|| format!("Failed to tag index {} with '{}'", id, name))?;
            }
            println!("Tagged {} entries with '{}'", ids.len(), name);
        }
        TagAction::Remove { name, ids } => {
            for id in &ids {
                storage
                    .untag_file(&name, *id)
                    .with_context(|| format!("Failed to untag index {} from '{}'", id, name))?;
            }
            println!("Removed '{}' from {} entries", name, ids.len());
        }
        TagAction::List => {
            let tags = storage.list_tags()?;
            if tags.is_empty() {
                println!("No tags defined");
            }
            for tag in tags {
                println!("{} ({} files)", tag.name, tag.file_count);
            }
        }
    }

    Ok(())
}

/// Handles `stats`: shows statistics for the catalog
async fn handle_stats(config: &Config, reference: &str) -> Result<()> {
    let storage = open(config, reference).await?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);
    Ok(())
}
