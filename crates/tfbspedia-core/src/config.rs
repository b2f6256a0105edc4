//! Centralized configuration for the TFBS search engine.
//!
//! Constants for pagination, batch limits, store timeouts and the naming of
//! the precomputed source files.

use crate::models::Species;
use std::time::Duration;

/// Search and pagination limits.
pub struct SearchConfig;

impl SearchConfig {
    pub const DEFAULT_PAGE_SIZE: usize = 25;
    pub const MAX_PAGE_SIZE: usize = 1000;
    pub const MAX_BATCH_QUERIES: usize = 1000;
    pub const MAX_BATCH_TEXT_BYTES: usize = 10 * 1024 * 1024; // 10MB
    /// Rows fetched per store call while materializing an export.
    pub const EXPORT_CHUNK_SIZE: usize = 1000;
    pub const AUTOCOMPLETE_LIMIT: usize = 20;
    /// Per-target store queries in flight while resolving a batch.
    pub const BATCH_QUERY_CONCURRENCY: usize = 4;
}

/// Record store settings.
pub struct StoreConfig;

impl StoreConfig {
    pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
    pub const SQLITE_PRAGMAS: &'static str = "
        PRAGMA busy_timeout=30000;
        PRAGMA temp_store=MEMORY;
    ";
}

/// Naming of the precomputed sources and databases under the data directory.
pub struct PathsConfig;

impl PathsConfig {
    pub const DOCUMENTS_DIR_NAME: &'static str = "documents";
    pub const ID_DIR_PREFIX: &'static str = "cell_lines_ID_";
    pub const COUNT_FILE_PREFIX: &'static str = "cell_line_TF_count_";
    pub const CELL_TISSUE_FILE_PREFIX: &'static str = "cell_tissue_unique_";
    pub const SNAPSHOT_EXTENSION: &'static str = "bin";

    /// Database file name for a species.
    pub fn database_file_name(species: Species) -> String {
        format!("tfbspedia_{}.db", species.as_str())
    }
}
