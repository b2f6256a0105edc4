//! Per-species count table, loaded whole on first use.

use super::once_map::OnceMap;
use super::CacheStats;
use crate::models::{CountEntry, EvidenceType, Species};
use crate::sources::{CountRow, CountSource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// (cell/tissue, factor) -> counts, nested so lookups borrow their keys.
#[derive(Debug, Default, Clone)]
pub struct CountTable {
    entries: HashMap<String, HashMap<String, CountEntry>>,
}

impl CountTable {
    /// Build a table from source rows. Repeated keys are summed.
    pub fn from_rows(rows: impl IntoIterator<Item = CountRow>) -> Self {
        let mut entries: HashMap<String, HashMap<String, CountEntry>> = HashMap::new();
        for row in rows {
            entries
                .entry(row.cell_tissue)
                .or_default()
                .entry(row.factor)
                .or_default()
                .accumulate(&row.counts);
        }
        Self { entries }
    }

    pub fn get(&self, cell_tissue: &str, factor: &str) -> Option<&CountEntry> {
        self.entries.get(cell_tissue)?.get(factor)
    }

    /// Number of (cell/tissue, factor) pairs.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Eagerly loaded count tables, one per species.
///
/// The whole table for a species is read on the first lookup for that
/// species; every later lookup is an in-memory probe.
pub struct CountIndexCache {
    source: Arc<dyn CountSource>,
    tables: OnceMap<Species, CountTable>,
}

impl CountIndexCache {
    pub fn new(source: Arc<dyn CountSource>) -> Self {
        Self {
            source,
            tables: OnceMap::new(),
        }
    }

    /// Count for one (cell/tissue, factor, evidence) triple. Misses are 0.
    pub async fn get_count(
        &self,
        species: Species,
        cell_tissue: &str,
        factor: &str,
        evidence: EvidenceType,
    ) -> u64 {
        self.table(species)
            .await
            .get(cell_tissue.trim(), factor.trim())
            .map(|entry| entry.bucket(evidence))
            .unwrap_or(0)
    }

    pub async fn table(&self, species: Species) -> Arc<CountTable> {
        self.tables
            .get_or_load(&species, || self.load(species))
            .await
    }

    async fn load(&self, species: Species) -> CountTable {
        match self.source.read_count_table(species).await {
            Ok(rows) => {
                let table = CountTable::from_rows(rows);
                info!("Count table for {} holds {} entries", species, table.len());
                table
            }
            Err(e) => {
                warn!("Count table for {} unreadable, treating as empty: {}", species, e);
                CountTable::default()
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            loaded_keys: self.tables.loaded(),
            source_reads: self.tables.loads(),
        }
    }
}
