//! Export rows and their CSV encoding.

use crate::config::SearchConfig;
use crate::error::{Result, TfbsError};
use crate::models::{ExportRow, RecordId, Species, TfbsRecord};
use crate::store::RecordStore;
use std::io::Write;

/// Column headers of a downloaded result file.
pub const EXPORT_HEADER: [&str; 6] = [
    "Chromosome",
    "Start",
    "End",
    "ID",
    "Confident_Score",
    "Important_Score",
];

/// Pair each record with its scores, preserving record order.
pub(crate) async fn attach_scores(
    store: &dyn RecordStore,
    species: Species,
    records: Vec<TfbsRecord>,
) -> Result<Vec<ExportRow>> {
    let mut rows = Vec::with_capacity(records.len());
    for chunk in records.chunks(SearchConfig::EXPORT_CHUNK_SIZE) {
        let ids: Vec<RecordId> = chunk.iter().map(|r| r.id).collect();
        let scores = store.fetch_scores(species, &ids).await?;
        rows.extend(chunk.iter().map(|record| ExportRow {
            record: record.clone(),
            scores: scores.get(&record.id).copied().unwrap_or_default(),
        }));
    }
    Ok(rows)
}

/// Keep only rows on `chromosome`. A missing or blank chromosome keeps every row.
pub fn retain_chromosome(rows: &mut Vec<ExportRow>, chromosome: Option<&str>) {
    let Some(chromosome) = chromosome.map(str::trim).filter(|c| !c.is_empty()) else {
        return;
    };
    rows.retain(|row| row.record.chromosome == chromosome);
}

/// Write export rows as CSV. The header is written even when `rows` is empty.
pub fn write_export_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_HEADER)?;

    let score = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    for row in rows {
        csv_writer.write_record([
            row.record.chromosome.clone(),
            row.record.start.to_string(),
            row.record.end.to_string(),
            row.record.id.to_string(),
            score(row.scores.confident),
            score(row.scores.importance),
        ])?;
    }

    csv_writer.flush().map_err(|e| TfbsError::Csv {
        message: format!("Failed to flush export: {}", e),
    })?;
    Ok(())
}
