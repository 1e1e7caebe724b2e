//! Statistics generation from the catalog
//!
//! This module provides functionality for extracting and displaying
//! catalog statistics from the storage layer.

use crate::output::format_size;
use crate::storage::Storage;
use crate::Result;

/// Catalog statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStatistics {
    /// Where the catalog was loaded from
    pub source: String,

    /// Number of files in the catalog
    pub total_files: u64,

    /// Number of distinct domains
    pub unique_domains: u64,

    /// Sum of the recorded content lengths
    pub total_bytes: u64,

    /// Number of tags defined
    pub tag_count: u64,

    /// File count per domain, largest first
    pub domains: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The catalog to query
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Successfully loaded statistics
/// * `Err(OpendirError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CatalogStatistics> {
    let total_files = storage.count_files()?;
    let unique_domains = storage.count_unique_domains()?;
    let total_bytes = storage.total_content_length()?;
    let tag_count = storage.list_tags()?.len() as u64;

    let mut domains = storage.get_domain_breakdown()?;
    domains.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(CatalogStatistics {
        source: storage.source().to_string(),
        total_files,
        unique_domains,
        total_bytes,
        tag_count,
        domains,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Database: {}", stats.source);
    println!();

    println!("Overview:");
    println!("  Files indexed: {}", stats.total_files);
    println!("  Unique domains: {}", stats.unique_domains);
    println!(
        "  Total size: {} ({} bytes)",
        format_size(stats.total_bytes),
        stats.total_bytes
    );
    println!("  Tags: {}", stats.tag_count);
    println!();

    if !stats.domains.is_empty() {
        println!("Files by Domain:");
        for (domain, count) in &stats.domains {
            let percentage = if stats.total_files > 0 {
                (*count as f64 / stats.total_files as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", domain, count, percentage);
        }
    }
}
