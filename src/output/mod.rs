//! Output module for catalog reports
//!
//! This module handles:
//! - Rendering catalog records as a text table
//! - Computing and printing catalog statistics

pub mod stats;
mod table;

pub use stats::{load_statistics, print_statistics, CatalogStatistics};
pub use table::{format_records, format_size};
