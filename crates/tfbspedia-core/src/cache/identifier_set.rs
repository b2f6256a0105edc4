//! Lazy per-key cache of cell-line/tissue identifier sets.

use super::once_map::OnceMap;
use super::CacheStats;
use crate::models::{RecordId, Species};
use crate::sources::IdSource;
use std::sync::Arc;
use tracing::{debug, warn};

/// Deduplicated, sorted record identifiers observed in one cell line or
/// tissue of one species. Immutable once built; clones share storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSet {
    species: Species,
    cell_tissue: Arc<str>,
    ids: Arc<[RecordId]>,
}

impl IdentifierSet {
    pub fn new(
        species: Species,
        cell_tissue: &str,
        ids: impl IntoIterator<Item = RecordId>,
    ) -> Self {
        let mut ids: Vec<RecordId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self {
            species,
            cell_tissue: Arc::from(cell_tissue),
            ids: Arc::from(ids),
        }
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn cell_tissue(&self) -> &str {
        &self.cell_tissue
    }

    /// Identifiers in ascending order.
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }
}

/// Resolved cell-line/tissue constraint.
///
/// `Unconstrained` means no filter was requested. `Only` with an empty set
/// means a filter was requested and matches nothing; the two must never be
/// confused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdFilter {
    Unconstrained,
    Only(IdentifierSet),
}

impl IdFilter {
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, IdFilter::Unconstrained)
    }

    /// A concrete filter that no record can satisfy.
    pub fn matches_nothing(&self) -> bool {
        matches!(self, IdFilter::Only(set) if set.is_empty())
    }

    pub fn as_set(&self) -> Option<&IdentifierSet> {
        match self {
            IdFilter::Unconstrained => None,
            IdFilter::Only(set) => Some(set),
        }
    }
}

/// Process-wide cache of identifier sets keyed by (species, cell/tissue).
///
/// Each key is read from its source on first request and served from memory
/// afterwards. A missing or unreadable source caches an empty set.
pub struct IdentifierSetCache {
    source: Arc<dyn IdSource>,
    sets: OnceMap<(Species, String), IdentifierSet>,
}

impl IdentifierSetCache {
    pub fn new(source: Arc<dyn IdSource>) -> Self {
        Self {
            source,
            sets: OnceMap::new(),
        }
    }

    /// Resolve a cell/tissue label into a filter.
    ///
    /// An absent or blank label is `IdFilter::Unconstrained`.
    pub async fn resolve(&self, species: Species, cell_tissue: Option<&str>) -> IdFilter {
        let Some(key) = cell_tissue.map(str::trim).filter(|k| !k.is_empty()) else {
            return IdFilter::Unconstrained;
        };

        let set = self
            .sets
            .get_or_load(&(species, key.to_string()), || self.load(species, key))
            .await;
        IdFilter::Only(IdentifierSet::clone(&set))
    }

    async fn load(&self, species: Species, key: &str) -> IdentifierSet {
        let ids = match self.source.read_ids(species, key).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    "Identifier source for {}/{} unreadable, treating as empty: {}",
                    species, key, e
                );
                Vec::new()
            }
        };
        let set = IdentifierSet::new(species, key, ids);
        debug!(
            "Loaded {} identifiers for {}/{}",
            set.len(),
            species,
            key
        );
        set
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            loaded_keys: self.sets.loaded(),
            source_reads: self.sets.loads(),
        }
    }
}
