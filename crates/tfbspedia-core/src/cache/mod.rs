//! In-memory caches over the precomputed indexes.

mod count_index;
mod identifier_set;
mod once_map;

pub use count_index::{CountIndexCache, CountTable};
pub use identifier_set::{IdFilter, IdentifierSet, IdentifierSetCache};

use serde::Serialize;

/// Load counters for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Keys whose value is loaded and being served from memory.
    pub loaded_keys: usize,
    /// Source reads started since process start.
    pub source_reads: u64,
}
