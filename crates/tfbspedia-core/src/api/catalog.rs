//! Catalog lookups, record details and cache status.

use crate::cache::CacheStats;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::models::{RecordDetails, RecordId, Species};
use crate::sources::read_cell_tissues;
use crate::TfbsApi;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cache counters plus process start time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    pub started_at: DateTime<Utc>,
    pub identifier_sets: CacheStats,
    pub count_tables: CacheStats,
}

impl TfbsApi {
    /// Factor names containing `fragment`, for autocomplete.
    pub async fn factor_names(&self, species: Species, fragment: &str) -> Result<Vec<String>> {
        self.store
            .factor_names(species, fragment, SearchConfig::AUTOCOMPLETE_LIMIT)
            .await
    }

    /// Cell/tissue labels offered for a species. Missing list is empty.
    pub async fn cell_tissues(&self, species: Species) -> Vec<String> {
        read_cell_tissues(&self.layout, species).await
    }

    pub async fn record_details(&self, species: Species, id: RecordId) -> Result<Option<RecordDetails>> {
        self.store.record_details(species, id).await
    }

    pub fn status(&self) -> ApiStatus {
        ApiStatus {
            started_at: self.started_at,
            identifier_sets: self.id_sets.stats(),
            count_tables: self.counts.stats(),
        }
    }
}
