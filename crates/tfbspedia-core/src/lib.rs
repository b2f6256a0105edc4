//! TFBSpedia Core - filtered search over transcription-factor binding sites.
//!
//! Resolves cell-line/tissue and evidence-type filters against precomputed
//! indexes held in process-wide caches, and answers paginated location,
//! factor-name and batch searches whose totals always agree with the
//! records they page and export.
//!
//! # Example
//!
//! ```rust,ignore
//! use tfbspedia_core::{EvidenceType, PageWindow, Species, TfbsApi};
//!
//! #[tokio::main]
//! async fn main() -> tfbspedia_core::Result<()> {
//!     let api = TfbsApi::builder("/srv/tfbspedia").build()?;
//!
//!     let page = api
//!         .search_by_name(Species::Human, "CTCF", Some("HepG2"), EvidenceType::All, PageWindow::default())
//!         .await?;
//!     println!("{} of {} records", page.records.len(), page.total);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod search;
pub mod sources;
pub mod store;

mod api;

// Re-export commonly used types
pub use api::{ApiStatus, TfbsApiBuilder};
pub use cache::{CacheStats, CountIndexCache, IdFilter, IdentifierSet, IdentifierSetCache};
pub use error::{Result, TfbsError};
pub use models::{
    CountEntry, EvidenceType, ExportRow, GenomicRegion, PageWindow, RecordDetails, RecordId,
    RecordScores, SearchPage, SearchTarget, Species, TfbsRecord,
};
pub use query::{parse_batch_text, parse_search_query, QueryBuilder, SearchConstraint};
pub use search::{
    retain_chromosome, write_export_csv, BatchRequest, BatchSearchEngine, BatchUniverse,
    SearchEngine,
};
pub use sources::{CountSource, CsvCountSource, CsvIdSource, IdSource, SourceLayout};
pub use store::{RecordStore, SqliteStore};

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

/// Main entry point for TFBS searches.
///
/// Owns the record store, both caches and the engines built on them. One
/// instance is meant to live for the whole process and be shared by every
/// request handler; a restart is what refreshes the cached indexes.
pub struct TfbsApi {
    data_dir: PathBuf,
    layout: SourceLayout,
    store: Arc<dyn RecordStore>,
    id_sets: Arc<IdentifierSetCache>,
    counts: Arc<CountIndexCache>,
    search: SearchEngine,
    batch: BatchSearchEngine,
    started_at: DateTime<Utc>,
}

impl TfbsApi {
    /// Start configuring an API rooted at `data_dir`.
    pub fn builder(data_dir: impl Into<PathBuf>) -> TfbsApiBuilder {
        TfbsApiBuilder::new(data_dir)
    }

    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }

    /// Single-target engine sharing this API's caches.
    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    /// Batch engine sharing this API's caches.
    pub fn batch_engine(&self) -> &BatchSearchEngine {
        &self.batch
    }
}
