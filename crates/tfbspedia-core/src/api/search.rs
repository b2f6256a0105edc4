//! Search, batch and export methods.

use crate::error::Result;
use crate::models::{
    EvidenceType, ExportRow, GenomicRegion, PageWindow, SearchPage, SearchTarget, Species,
};
use crate::query::{parse_batch_text, parse_search_query};
use crate::search::BatchRequest;
use crate::TfbsApi;

impl TfbsApi {
    /// Parse a free-text query and run the matching search.
    pub async fn search_query(
        &self,
        species: Species,
        query: &str,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
        window: PageWindow,
    ) -> Result<SearchPage> {
        let target = parse_search_query(query)?;
        self.search.search(species, &target, cell_tissue, evidence, window).await
    }

    pub async fn search_by_location(
        &self,
        species: Species,
        region: &GenomicRegion,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
        window: PageWindow,
    ) -> Result<SearchPage> {
        self.search
            .search_by_location(species, region, cell_tissue, evidence, window)
            .await
    }

    pub async fn search_by_name(
        &self,
        species: Species,
        factor: &str,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
        window: PageWindow,
    ) -> Result<SearchPage> {
        self.search
            .search_by_name(species, factor, cell_tissue, evidence, window)
            .await
    }

    /// One page of a batch with its exact deduplicated total.
    pub async fn batch_search(&self, request: &BatchRequest, window: PageWindow) -> Result<SearchPage> {
        self.batch.batch_search(request, window).await
    }

    /// Parse uploaded batch text into a request.
    pub fn batch_request_from_text(
        &self,
        species: Species,
        text: &str,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
    ) -> Result<BatchRequest> {
        let mut request = BatchRequest::new(species, parse_batch_text(text)?).with_evidence(evidence);
        request.cell_tissue = cell_tissue.map(str::to_string);
        Ok(request)
    }

    /// Display-only estimate for a batch; see
    /// [`BatchSearchEngine::estimate_total`](crate::BatchSearchEngine::estimate_total).
    pub async fn batch_estimate(&self, request: &BatchRequest) -> Result<Option<u64>> {
        self.batch.estimate_total(request).await
    }

    /// Every record a single-target search counts.
    pub async fn export_search(
        &self,
        species: Species,
        target: &SearchTarget,
        cell_tissue: Option<&str>,
        evidence: EvidenceType,
    ) -> Result<Vec<ExportRow>> {
        self.search.export(species, target, cell_tissue, evidence).await
    }

    /// Every record of a batch's deduplicated universe.
    pub async fn export_batch(&self, request: &BatchRequest) -> Result<Vec<ExportRow>> {
        self.batch.export(request).await
    }
}
