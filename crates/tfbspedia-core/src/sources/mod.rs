//! Read capabilities over the precomputed, externally produced indexes.
//!
//! Two sources feed the caches:
//! - identifier sets, one per (species, cell/tissue) key
//! - the per-species (cell/tissue, factor) count table
//!
//! Both are read-only. A missing source is not an error and yields an empty
//! result; an unreadable one returns an error that the caches log and
//! degrade to empty.

mod csv_files;
mod snapshot;

pub use csv_files::{read_cell_tissues, safe_file_stem, CsvCountSource, CsvIdSource, SourceLayout};

use crate::error::Result;
use crate::models::{CountEntry, RecordId, Species};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One row of the count-aggregate source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
    pub cell_tissue: String,
    pub factor: String,
    pub counts: CountEntry,
}

/// Per-key identifier-set source.
#[async_trait]
pub trait IdSource: Send + Sync {
    /// Read the identifiers recorded for one cell line or tissue.
    ///
    /// Returns an empty list when no source exists for the key.
    async fn read_ids(&self, species: Species, cell_tissue: &str) -> Result<Vec<RecordId>>;
}

/// Per-species count-aggregate source.
#[async_trait]
pub trait CountSource: Send + Sync {
    /// Read every (cell/tissue, factor) row for a species.
    async fn read_count_table(&self, species: Species) -> Result<Vec<CountRow>>;
}
