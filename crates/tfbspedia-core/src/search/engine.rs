//! Single-target search: one location or one factor name.

use super::export::attach_scores;
use crate::cache::{CountIndexCache, IdentifierSetCache};
use crate::config::SearchConfig;
use crate::error::Result;
use crate::models::{
    EvidenceType, ExportRow, GenomicRegion, PageWindow, SearchPage, SearchTarget, Species,
    TfbsRecord,
};
use crate::query::{QueryBuilder, QueryPlan, SearchConstraint, StoreQuery};
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::debug;

/// Orchestrates single-target searches over the shared caches and store.
///
/// The constraint for a request is resolved once and the resulting
/// [`StoreQuery`] feeds both the total and the page, so the two always
/// describe the same record set.
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn RecordStore>,
    id_sets: Arc<IdentifierSetCache>,
    counts: Arc<CountIndexCache>,
}

impl SearchEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        id_sets: Arc<IdentifierSetCache>,
        counts: Arc<CountIndexCache>,
    ) -> Self {
        Self {
            store,
            id_sets,
            counts,
        }
    }

    /// Resolve the cell/tissue label and evidence type for one request.
    pub async fn constraint(
        &self,
        species: Species,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
    ) -> SearchConstraint {
        let ids = self.id_sets.resolve(species, cell_tissue).await;
        SearchConstraint::new(ids, evidence)
    }

    /// Records lying entirely inside `region`.
    ///
    /// The evidence type does not narrow location matches; it is carried
    /// only so callers can pass one constraint shape to every mode.
    pub async fn search_by_location(
        &self,
        species: Species,
        region: &GenomicRegion,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
        window: PageWindow,
    ) -> Result<SearchPage> {
        region.validate()?;
        let target = SearchTarget::Location(region.clone());
        let constraint = self.constraint(species, cell_tissue, evidence).await;

        let QueryPlan::Run { query, window } =
            QueryBuilder::build(species, &target, &constraint, window)
        else {
            return Ok(SearchPage::empty());
        };

        let total = self.store.count(&query).await?;
        let records = self.store.fetch_page(&query, window).await?;
        Ok(SearchPage { records, total })
    }

    /// Records annotated with `factor` in the evidence column(s) selected by
    /// `evidence`.
    pub async fn search_by_name(
        &self,
        species: Species,
        factor: &str,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
        window: PageWindow,
    ) -> Result<SearchPage> {
        let target = SearchTarget::Name(factor.trim().to_string());
        target.validate()?;
        let constraint = self.constraint(species, cell_tissue, evidence).await;

        let QueryPlan::Run { query, window } =
            QueryBuilder::build(species, &target, &constraint, window)
        else {
            return Ok(SearchPage::empty());
        };

        let total = self.name_total(&query, factor.trim()).await?;
        let records = self.store.fetch_page(&query, window).await?;
        Ok(SearchPage { records, total })
    }

    /// Dispatch on the target kind.
    pub async fn search(
        &self,
        species: Species,
        target: &SearchTarget,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
        window: PageWindow,
    ) -> Result<SearchPage> {
        match target {
            SearchTarget::Location(region) => {
                self.search_by_location(species, region, cell_tissue, evidence, window)
                    .await
            }
            SearchTarget::Name(factor) => {
                self.search_by_name(species, factor, cell_tissue, evidence, window)
                    .await
            }
        }
    }

    /// Every record the matching search would count, with scores attached.
    pub async fn export(
        &self,
        species: Species,
        target: &SearchTarget,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
    ) -> Result<Vec<ExportRow>> {
        let target = match target {
            SearchTarget::Name(factor) => SearchTarget::Name(factor.trim().to_string()),
            location => location.clone(),
        };
        target.validate()?;
        let constraint = self.constraint(species, cell_tissue, evidence).await;

        let Some(query) = QueryBuilder::query_for(species, &target, &constraint) else {
            return Ok(Vec::new());
        };
        let records = self.fetch_all(&query).await?;
        attach_scores(self.store.as_ref(), species, records).await
    }

    /// Page through a query until the store runs out of rows.
    async fn fetch_all(&self, query: &StoreQuery) -> Result<Vec<TfbsRecord>> {
        let mut records = Vec::new();
        let mut window = PageWindow::new(0, SearchConfig::EXPORT_CHUNK_SIZE)?;
        loop {
            let page = self.store.fetch_page(query, window).await?;
            let done = page.len() < window.limit();
            records.extend(page);
            if done {
                break;
            }
            window = window.next();
        }
        debug!("Exported {} records for {:?}", records.len(), query.target);
        Ok(records)
    }

    /// Total for a name search.
    ///
    /// A cell/tissue-constrained search reads the per-species count table.
    /// An unconstrained one reads the store's per-factor aggregate, falling
    /// back to the counting query when the factor has no aggregate row.
    async fn name_total(&self, query: &StoreQuery, factor: &str) -> Result<u64> {
        if let Some(set) = &query.restriction {
            return Ok(self
                .counts
                .get_count(query.species, set.cell_tissue(), factor, query.evidence)
                .await);
        }

        match self.store.factor_totals(query.species, factor).await? {
            Some(entry) => Ok(entry.bucket(query.evidence)),
            None => {
                debug!("No aggregate for {}, counting in store", factor);
                self.store.count(query).await
            }
        }
    }
}
