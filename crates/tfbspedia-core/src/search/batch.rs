//! Multi-target search over a deduplicated identifier universe.
//!
//! Per-target matches are unioned before anything is counted or paged. The
//! reported total is the size of that union, and both pages and exports are
//! slices of the same sorted identifier list, so a record matched by several
//! targets is counted and exported exactly once.

use super::export::attach_scores;
use crate::cache::IdentifierSetCache;
use crate::config::SearchConfig;
use crate::error::{Result, TfbsError};
use crate::models::{
    EvidenceType, ExportRow, PageWindow, RecordId, SearchPage, SearchTarget, Species, TfbsRecord,
};
use crate::query::{QueryBuilder, SearchConstraint, StoreQuery};
use crate::store::RecordStore;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// A batch search request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub species: Species,
    pub targets: Vec<SearchTarget>,
    #[serde(default)]
    pub cell_tissue: Option<String>,
    #[serde(default)]
    pub evidence: EvidenceType,
}

impl BatchRequest {
    pub fn new(species: Species, targets: Vec<SearchTarget>) -> Self {
        Self {
            species,
            targets,
            cell_tissue: None,
            evidence: EvidenceType::All,
        }
    }

    pub fn with_cell_tissue(mut self, cell_tissue: impl Into<String>) -> Self {
        self.cell_tissue = Some(cell_tissue.into());
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceType) -> Self {
        self.evidence = evidence;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(TfbsError::invalid("targets", "batch has no targets"));
        }
        if self.targets.len() > SearchConfig::MAX_BATCH_QUERIES {
            return Err(TfbsError::invalid(
                "targets",
                format!(
                    "{} targets exceeds the limit of {}",
                    self.targets.len(),
                    SearchConfig::MAX_BATCH_QUERIES
                ),
            ));
        }
        self.targets.iter().try_for_each(SearchTarget::validate)
    }

    /// Targets with factor names trimmed.
    fn normalized_targets(&self) -> Vec<SearchTarget> {
        self.targets
            .iter()
            .map(|target| match target {
                SearchTarget::Name(name) => SearchTarget::Name(name.trim().to_string()),
                location => location.clone(),
            })
            .collect()
    }
}

/// Distinct identifiers matched by any target of one batch, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUniverse {
    species: Species,
    ids: Vec<RecordId>,
}

impl BatchUniverse {
    pub fn new(species: Species, ids: impl IntoIterator<Item = RecordId>) -> Self {
        let ids: BTreeSet<RecordId> = ids.into_iter().collect();
        Self {
            species,
            ids: ids.into_iter().collect(),
        }
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers inside `window`; empty past the end.
    pub fn window(&self, window: PageWindow) -> &[RecordId] {
        let start = window.offset().min(self.ids.len());
        let end = window.offset().saturating_add(window.limit()).min(self.ids.len());
        &self.ids[start..end]
    }
}

/// Orchestrates batch searches.
#[derive(Clone)]
pub struct BatchSearchEngine {
    store: Arc<dyn RecordStore>,
    id_sets: Arc<IdentifierSetCache>,
}

impl BatchSearchEngine {
    pub fn new(store: Arc<dyn RecordStore>, id_sets: Arc<IdentifierSetCache>) -> Self {
        Self { store, id_sets }
    }

    /// Build the deduplicated universe for a request.
    ///
    /// The cell/tissue constraint is resolved once and shared by every
    /// target. An empty resolved set yields an empty universe without
    /// touching the store.
    pub async fn resolve_universe(&self, request: &BatchRequest) -> Result<BatchUniverse> {
        request.validate()?;
        let species = request.species;

        let ids = self
            .id_sets
            .resolve(species, request.cell_tissue.as_deref())
            .await;
        let constraint = SearchConstraint::new(ids, request.evidence);
        if constraint.matches_nothing() {
            return Ok(BatchUniverse::new(species, []));
        }

        let queries: Vec<StoreQuery> = request
            .normalized_targets()
            .iter()
            .filter_map(|target| QueryBuilder::query_for(species, target, &constraint))
            .collect();

        let store = &self.store;
        let mut matches = stream::iter(queries)
            .map(|query| async move { store.matching_ids(&query).await })
            .buffer_unordered(SearchConfig::BATCH_QUERY_CONCURRENCY);

        let mut union = BTreeSet::new();
        let mut matched = 0usize;
        while let Some(ids) = matches.next().await {
            let ids = ids?;
            matched += ids.len();
            union.extend(ids);
        }

        info!(
            "Batch of {} targets matched {} records ({} distinct)",
            request.targets.len(),
            matched,
            union.len()
        );
        Ok(BatchUniverse {
            species,
            ids: union.into_iter().collect(),
        })
    }

    /// Records for one window of a resolved universe.
    pub async fn page(&self, universe: &BatchUniverse, window: PageWindow) -> Result<Vec<TfbsRecord>> {
        let ids = universe.window(window);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store.fetch_records(universe.species(), ids).await
    }

    /// Resolve the universe and return one page of it with the exact total.
    pub async fn batch_search(&self, request: &BatchRequest, window: PageWindow) -> Result<SearchPage> {
        let universe = self.resolve_universe(request).await?;
        let records = self.page(&universe, window).await?;
        Ok(SearchPage {
            records,
            total: universe.len() as u64,
        })
    }

    /// Every record of a resolved universe, in universe order, with scores.
    pub async fn export_universe(&self, universe: &BatchUniverse) -> Result<Vec<ExportRow>> {
        let mut records = Vec::with_capacity(universe.len());
        for chunk in universe.ids().chunks(SearchConfig::EXPORT_CHUNK_SIZE) {
            records.extend(self.store.fetch_records(universe.species(), chunk).await?);
        }
        debug!("Exporting {} batch records", records.len());
        attach_scores(self.store.as_ref(), universe.species(), records).await
    }

    pub async fn export(&self, request: &BatchRequest) -> Result<Vec<ExportRow>> {
        let universe = self.resolve_universe(request).await?;
        self.export_universe(&universe).await
    }

    /// Sum of per-factor aggregates, as a display-only estimate.
    ///
    /// Available only for unconstrained, all-evidence batches made of factor
    /// names; returns `None` otherwise. Overlapping factors are counted once
    /// per factor, so this may exceed the exact total and must never be
    /// reported alongside an export.
    pub async fn estimate_total(&self, request: &BatchRequest) -> Result<Option<u64>> {
        request.validate()?;
        let constrained = request
            .cell_tissue
            .as_deref()
            .is_some_and(|label| !label.trim().is_empty());
        if constrained || request.evidence != EvidenceType::All {
            return Ok(None);
        }

        let mut estimate = 0u64;
        for target in request.normalized_targets() {
            let SearchTarget::Name(factor) = target else {
                return Ok(None);
            };
            if let Some(entry) = self.store.factor_totals(request.species, &factor).await? {
                estimate += entry.all;
            }
        }
        Ok(Some(estimate))
    }
}
