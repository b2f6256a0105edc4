//! Search targets, pagination windows and result pages.

use super::TfbsRecord;
use crate::config::SearchConfig;
use crate::error::{Result, TfbsError};
use serde::{Deserialize, Serialize};

/// A chromosome, optionally narrowed to a closed coordinate range.
///
/// A record matches a ranged region when it lies entirely inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenomicRegion {
    pub chromosome: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl GenomicRegion {
    /// Whole-chromosome region.
    pub fn chromosome(chromosome: impl Into<String>) -> Self {
        Self {
            chromosome: chromosome.into(),
            start: None,
            end: None,
        }
    }

    /// Region bounded by `start..=end`.
    pub fn range(chromosome: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            chromosome: chromosome.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// Both bounds, when the region is ranged.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Reject malformed regions before any store access.
    pub fn validate(&self) -> Result<()> {
        if self.chromosome.trim().is_empty() {
            return Err(TfbsError::invalid("region", "chromosome must not be empty"));
        }
        match (self.start, self.end) {
            (None, None) => Ok(()),
            (Some(start), Some(end)) => {
                if start < 0 {
                    Err(TfbsError::invalid("region", "start must not be negative"))
                } else if start > end {
                    Err(TfbsError::invalid(
                        "region",
                        format!("start {} exceeds end {}", start, end),
                    ))
                } else {
                    Ok(())
                }
            }
            _ => Err(TfbsError::invalid(
                "region",
                "start and end must be given together",
            )),
        }
    }
}

impl std::fmt::Display for GenomicRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.bounds() {
            Some((start, end)) => write!(f, "{},{},{}", self.chromosome, start, end),
            None => write!(f, "{}", self.chromosome),
        }
    }
}

/// One target of a search: a genomic location or a factor name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum SearchTarget {
    Location(GenomicRegion),
    Name(String),
}

impl SearchTarget {
    pub fn validate(&self) -> Result<()> {
        match self {
            SearchTarget::Location(region) => region.validate(),
            SearchTarget::Name(name) if name.trim().is_empty() => {
                Err(TfbsError::invalid("factor_name", "factor name must not be empty"))
            }
            SearchTarget::Name(_) => Ok(()),
        }
    }
}

/// Pagination window: `limit` rows starting at `offset`.
///
/// Construction validates the bounds, so a window in hand is always usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    offset: usize,
    limit: usize,
}

impl PageWindow {
    pub fn new(offset: usize, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(TfbsError::invalid("page", "limit must be at least 1"));
        }
        if limit > SearchConfig::MAX_PAGE_SIZE {
            return Err(TfbsError::invalid(
                "page",
                format!(
                    "limit {} exceeds the maximum page size {}",
                    limit,
                    SearchConfig::MAX_PAGE_SIZE
                ),
            ));
        }
        if i64::try_from(offset).is_err() {
            return Err(TfbsError::invalid(
                "page",
                format!("offset {} exceeds the largest row offset {}", offset, i64::MAX),
            ));
        }
        Ok(Self { offset, limit })
    }

    /// Build a window from signed request values, rejecting negatives.
    pub fn from_signed(offset: i64, limit: i64) -> Result<Self> {
        let offset = usize::try_from(offset)
            .map_err(|_| TfbsError::invalid("page", "offset must not be negative"))?;
        let limit = usize::try_from(limit)
            .map_err(|_| TfbsError::invalid("page", "limit must not be negative"))?;
        Self::new(offset, limit)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The window following this one. The offset saturates, so a window
    /// walked past the row-offset range is rejected by the store.
    pub fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: SearchConfig::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the total size of the result set it came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub records: Vec<TfbsRecord>,
    pub total: u64,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self::default()
    }
}
