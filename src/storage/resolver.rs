//! Catalog resolution
//!
//! Commands name their catalog with a single string that may be a profile
//! name, a URL, or a filesystem path. Each resolver below either claims the
//! string or passes it on to the next one.

use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::url::is_url;
use crate::{OpendirError, Result};
use reqwest::Client;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Outcome of one resolver
pub enum Resolution {
    /// The reference named a catalog and it was opened
    Resolved(SqliteStorage),
    /// The reference is not of this resolver's kind
    TryNext,
}

/// Opens the catalog a reference points at
///
/// The reference is tried, in order, as a profile name (`default` being the
/// configured default catalog), as a URL, and as a filesystem path.
///
/// # Errors
///
/// * `CatalogFetch` - the reference is a URL that answered with a non-2xx status
/// * `CatalogNotFound` - no resolver recognised the reference
pub async fn open_catalog(config: &Config, client: &Client, reference: &str) -> Result<SqliteStorage> {
    let reference = reference.trim();

    if let Resolution::Resolved(storage) = resolve_profile(config, client, reference).await? {
        return Ok(storage.with_dedup(config.catalog.dedup));
    }

    if let Resolution::Resolved(storage) = resolve_url(client, reference).await? {
        return Ok(storage.with_dedup(config.catalog.dedup));
    }

    if let Resolution::Resolved(storage) = resolve_path(reference)? {
        return Ok(storage.with_dedup(config.catalog.dedup));
    }

    Err(OpendirError::CatalogNotFound(format!(
        "Cannot find database referenced by '{}'.",
        reference
    )))
}

/// Resolves a configured profile name
///
/// Profile catalogs stored on disk are created on first use.
pub async fn resolve_profile(config: &Config, client: &Client, name: &str) -> Result<Resolution> {
    let resource = match config.profile_resource(name) {
        Some(resource) => resource,
        None => return Ok(Resolution::TryNext),
    };

    debug!(profile = name, resource = %resource, "Resolved catalog profile");

    if is_url(&resource) {
        return fetch_catalog(client, &resource).await.map(Resolution::Resolved);
    }

    let storage = SqliteStorage::new(Path::new(&resource))?;
    Ok(Resolution::Resolved(storage))
}

/// Resolves a URL by downloading the catalog it serves
pub async fn resolve_url(client: &Client, reference: &str) -> Result<Resolution> {
    if !is_url(reference) {
        return Ok(Resolution::TryNext);
    }

    fetch_catalog(client, reference).await.map(Resolution::Resolved)
}

/// Resolves an existing catalog file
///
/// `~` and environment variables are expanded first. Paths that don't exist
/// are passed on rather than created.
pub fn resolve_path(reference: &str) -> Result<Resolution> {
    let expanded = shellexpand::full(reference)
        .map(|path| path.into_owned())
        .unwrap_or_else(|_| reference.to_string());
    let path = Path::new(&expanded);

    if !path.is_file() {
        return Ok(Resolution::TryNext);
    }

    let storage = SqliteStorage::new(path)?;
    Ok(Resolution::Resolved(storage))
}

/// Downloads a catalog into a temporary file and opens it read-only
async fn fetch_catalog(client: &Client, url: &str) -> Result<SqliteStorage> {
    info!(url, "Downloading catalog");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| OpendirError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(OpendirError::CatalogFetch {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| OpendirError::Http {
        url: url.to_string(),
        source,
    })?;

    let mut file = NamedTempFile::new()?;
    file.write_all(&body)?;
    file.flush()?;

    debug!(url, bytes = body.len(), path = %file.path().display(), "Catalog saved");

    SqliteStorage::from_download(file, url)
}
