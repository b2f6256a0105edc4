//! Record store capability and its SQLite implementation.

mod sqlite;

pub use sqlite::{ensure_schema, SqliteStore};

use crate::error::Result;
use crate::models::{
    CountEntry, PageWindow, RecordDetails, RecordId, RecordScores, Species, TfbsRecord,
};
use crate::query::StoreQuery;
use async_trait::async_trait;
use std::collections::HashMap;

/// What the search engines need from the record store.
///
/// Every method that takes a `StoreQuery` evaluates the same predicate set,
/// and all row-returning methods order by identifier ascending.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Counting form of a query.
    async fn count(&self, query: &StoreQuery) -> Result<u64>;

    /// Paged form of a query.
    async fn fetch_page(&self, query: &StoreQuery, window: PageWindow) -> Result<Vec<TfbsRecord>>;

    /// Every identifier a query matches, ascending.
    async fn matching_ids(&self, query: &StoreQuery) -> Result<Vec<RecordId>>;

    /// Records for a set of identifiers, ascending. Unknown ids are skipped.
    async fn fetch_records(&self, species: Species, ids: &[RecordId]) -> Result<Vec<TfbsRecord>>;

    /// Precomputed per-factor totals, if the store carries them.
    async fn factor_totals(&self, species: Species, factor: &str) -> Result<Option<CountEntry>>;

    /// Scores for a set of identifiers. Ids without any score are absent.
    async fn fetch_scores(
        &self,
        species: Species,
        ids: &[RecordId],
    ) -> Result<HashMap<RecordId, RecordScores>>;

    /// Factor names containing `fragment` (case-insensitive), sorted.
    async fn factor_names(&self, species: Species, fragment: &str, limit: usize)
        -> Result<Vec<String>>;

    async fn record_details(&self, species: Species, id: RecordId) -> Result<Option<RecordDetails>>;
}
