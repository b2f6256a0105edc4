//! Composition of search constraints into store queries.

use crate::cache::{IdFilter, IdentifierSet};
use crate::models::{EvidenceType, PageWindow, SearchTarget, Species};
use tracing::debug;

/// The resolved per-request constraint shared by the count and the page of
/// one search (or every target of one batch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConstraint {
    pub ids: IdFilter,
    pub evidence: EvidenceType,
}

impl SearchConstraint {
    pub fn new(ids: IdFilter, evidence: EvidenceType) -> Self {
        Self { ids, evidence }
    }

    pub fn unconstrained(evidence: EvidenceType) -> Self {
        Self::new(IdFilter::Unconstrained, evidence)
    }

    /// True when a cell/tissue filter resolved to an empty set.
    pub fn matches_nothing(&self) -> bool {
        self.ids.matches_nothing()
    }
}

/// Store-facing predicate set for one target.
///
/// A store answers both the counting form (`RecordStore::count`) and the
/// paged form (`RecordStore::fetch_page`) from the same value, so the two
/// can never drift apart. Rows are ordered by identifier ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    pub species: Species,
    pub target: SearchTarget,
    /// Which name column(s) a name target is matched against. Location
    /// targets match on coordinates only.
    pub evidence: EvidenceType,
    /// Identifier membership restriction; `None` means unrestricted.
    pub restriction: Option<IdentifierSet>,
}

/// Outcome of query composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// The constraint can match no record; the store must not be queried.
    Empty,
    Run { query: StoreQuery, window: PageWindow },
}

impl QueryPlan {
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryPlan::Empty)
    }

    pub fn query(&self) -> Option<&StoreQuery> {
        match self {
            QueryPlan::Empty => None,
            QueryPlan::Run { query, .. } => Some(query),
        }
    }
}

/// Stateless builder turning (target, constraint, window) into a plan.
pub struct QueryBuilder;

impl QueryBuilder {
    pub fn build(
        species: Species,
        target: &SearchTarget,
        constraint: &SearchConstraint,
        window: PageWindow,
    ) -> QueryPlan {
        match Self::query_for(species, target, constraint) {
            Some(query) => QueryPlan::Run { query, window },
            None => QueryPlan::Empty,
        }
    }

    /// The unpaged predicate set, or `None` when it short-circuits to empty.
    pub fn query_for(
        species: Species,
        target: &SearchTarget,
        constraint: &SearchConstraint,
    ) -> Option<StoreQuery> {
        let restriction = match &constraint.ids {
            IdFilter::Unconstrained => None,
            IdFilter::Only(set) if set.is_empty() => {
                debug!(
                    "Filter {}/{} is empty, skipping store for {:?}",
                    species,
                    set.cell_tissue(),
                    target
                );
                return None;
            }
            IdFilter::Only(set) => Some(set.clone()),
        };

        Some(StoreQuery {
            species,
            target: target.clone(),
            evidence: constraint.evidence,
            restriction,
        })
    }
}
