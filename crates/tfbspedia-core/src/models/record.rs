//! Record-level types returned by the store and the export path.

use super::EvidenceType;
use serde::{Deserialize, Serialize};

/// Opaque store key of one TFBS record.
pub type RecordId = i64;

/// One binding-site record as returned in search pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TfbsRecord {
    pub id: RecordId,
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
}

/// Per-record scores attached to exports and detail views.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordScores {
    pub confident: Option<f64>,
    pub importance: Option<f64>,
}

/// One line of a downloaded result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub record: TfbsRecord,
    pub scores: RecordScores,
}

/// Full description of one record for the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetails {
    pub record: TfbsRecord,
    /// Comma-joined direct-evidence factor names.
    pub direct_factors: Option<String>,
    /// Comma-joined predicted-evidence factor names.
    pub predicted_factors: Option<String>,
    /// Sorted, distinct cell-line/tissue labels.
    pub cell_tissues: Vec<String>,
    pub scores: RecordScores,
}

/// Pre-aggregated record counts for one (cell/tissue, factor) pair or one
/// factor overall.
///
/// The three buckets are independent aggregates read from the index; `all`
/// is not derived from the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountEntry {
    pub all: u64,
    pub direct: u64,
    pub predicted: u64,
}

impl CountEntry {
    /// Read the bucket matching an evidence constraint.
    pub fn bucket(&self, evidence: EvidenceType) -> u64 {
        match evidence {
            EvidenceType::All => self.all,
            EvidenceType::Direct => self.direct,
            EvidenceType::Predicted => self.predicted,
        }
    }

    /// Add another entry bucket by bucket.
    pub fn accumulate(&mut self, other: &CountEntry) {
        self.all += other.all;
        self.direct += other.direct;
        self.predicted += other.predicted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_selection() {
        let entry = CountEntry {
            all: 6,
            direct: 5,
            predicted: 2,
        };
        assert_eq!(entry.bucket(EvidenceType::All), 6);
        assert_eq!(entry.bucket(EvidenceType::Direct), 5);
        assert_eq!(entry.bucket(EvidenceType::Predicted), 2);
    }

    #[test]
    fn test_accumulate() {
        let mut entry = CountEntry {
            all: 1,
            direct: 1,
            predicted: 0,
        };
        entry.accumulate(&CountEntry {
            all: 3,
            direct: 0,
            predicted: 3,
        });
        assert_eq!(entry.all, 4);
        assert_eq!(entry.direct, 1);
        assert_eq!(entry.predicted, 3);
    }
}
