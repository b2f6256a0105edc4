//! CSV-file sources laid out under a documents directory.
//!
//! ```text
//! documents/
//!   cell_lines_ID_human/HepG2.csv          ID
//!   cell_line_TF_count_human.csv           cell_tissue,TFBS,predicted_TFBS,count_of_id
//!   cell_line_TF_count_human.bin           bincode snapshot of the above
//!   cell_tissue_unique_human.csv           cell_tissue
//! ```

use super::snapshot;
use super::{CountRow, CountSource, IdSource};
use crate::config::PathsConfig;
use crate::error::{Result, TfbsError};
use crate::models::{CountEntry, RecordId, Species};
use async_trait::async_trait;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File naming for the precomputed sources.
#[derive(Debug, Clone)]
pub struct SourceLayout {
    root: PathBuf,
}

impl SourceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn id_file(&self, species: Species, cell_tissue: &str) -> PathBuf {
        self.root
            .join(format!("{}{}", PathsConfig::ID_DIR_PREFIX, species.as_str()))
            .join(format!("{}.csv", safe_file_stem(cell_tissue)))
    }

    pub fn count_file(&self, species: Species) -> PathBuf {
        self.root.join(format!(
            "{}{}.csv",
            PathsConfig::COUNT_FILE_PREFIX,
            species.as_str()
        ))
    }

    pub fn count_snapshot(&self, species: Species) -> PathBuf {
        self.count_file(species)
            .with_extension(PathsConfig::SNAPSHOT_EXTENSION)
    }

    pub fn cell_tissue_file(&self, species: Species) -> PathBuf {
        self.root.join(format!(
            "{}{}.csv",
            PathsConfig::CELL_TISSUE_FILE_PREFIX,
            species.as_str()
        ))
    }
}

/// File stem the exporter uses for a cell/tissue label.
///
/// Spaces become underscores, commas are dropped and slashes become
/// underscores, so a label can never address a path outside its directory.
pub fn safe_file_stem(cell_tissue: &str) -> String {
    cell_tissue
        .trim()
        .replace(' ', "_")
        .replace(',', "")
        .replace('/', "_")
        .replace('\\', "_")
}

/// Identifier sets read from `cell_lines_ID_{species}/{key}.csv`.
#[derive(Debug, Clone)]
pub struct CsvIdSource {
    layout: SourceLayout,
}

impl CsvIdSource {
    pub fn new(layout: SourceLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl IdSource for CsvIdSource {
    async fn read_ids(&self, species: Species, cell_tissue: &str) -> Result<Vec<RecordId>> {
        let path = self.layout.id_file(species, cell_tissue);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("No identifier file at {}", path.display());
            return Ok(Vec::new());
        }

        tokio::task::spawn_blocking(move || read_id_file(&path))
            .await
            .map_err(|e| TfbsError::Other(format!("Identifier read task failed: {}", e)))?
    }
}

fn read_id_file(path: &Path) -> Result<Vec<RecordId>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| TfbsError::Csv {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;

    let headers = reader.headers()?.clone();
    let column = headers.iter().position(|h| h == "ID").ok_or_else(|| TfbsError::Csv {
        message: format!("{} has no ID column", path.display()),
    })?;

    let mut ids = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        match record.get(column).and_then(|raw| raw.parse::<RecordId>().ok()) {
            Some(id) => ids.push(id),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Skipped {} malformed rows in {}", skipped, path.display());
    }
    Ok(ids)
}

/// One line of the count export: a record count for a cell/tissue and a
/// direct factor, a predicted factor, or both.
#[derive(Debug, Deserialize)]
struct RawCountRow {
    #[serde(default)]
    cell_tissue: String,
    #[serde(default, rename = "TFBS")]
    direct: String,
    #[serde(default, rename = "predicted_TFBS")]
    predicted: String,
    #[serde(default)]
    count_of_id: String,
}

impl RawCountRow {
    /// Split into per-factor rows. A direct factor feeds the direct and all
    /// buckets, a predicted factor the predicted and all buckets.
    fn into_count_rows(self) -> Option<Vec<CountRow>> {
        let count = match self.count_of_id.as_str() {
            "" => 0,
            raw => raw.parse::<u64>().ok()?,
        };

        let mut rows = Vec::with_capacity(2);
        if !self.cell_tissue.is_empty() && !self.direct.is_empty() {
            rows.push(CountRow {
                cell_tissue: self.cell_tissue.clone(),
                factor: self.direct,
                counts: CountEntry {
                    all: count,
                    direct: count,
                    predicted: 0,
                },
            });
        }
        if !self.cell_tissue.is_empty() && !self.predicted.is_empty() {
            rows.push(CountRow {
                cell_tissue: self.cell_tissue,
                factor: self.predicted,
                counts: CountEntry {
                    all: count,
                    direct: 0,
                    predicted: count,
                },
            });
        }
        Some(rows)
    }
}

/// Count table read from `cell_line_TF_count_{species}.csv`, optionally
/// through a bincode snapshot kept beside it.
#[derive(Debug, Clone)]
pub struct CsvCountSource {
    layout: SourceLayout,
    use_snapshot: bool,
}

impl CsvCountSource {
    pub fn new(layout: SourceLayout) -> Self {
        Self {
            layout,
            use_snapshot: true,
        }
    }

    /// Enable or disable the snapshot fast path.
    ///
    /// Default: `true`
    pub fn with_snapshot(mut self, enable: bool) -> Self {
        self.use_snapshot = enable;
        self
    }
}

#[async_trait]
impl CountSource for CsvCountSource {
    async fn read_count_table(&self, species: Species) -> Result<Vec<CountRow>> {
        let csv_path = self.layout.count_file(species);
        let snapshot_path = self.layout.count_snapshot(species);
        let use_snapshot = self.use_snapshot;

        tokio::task::spawn_blocking(move || {
            load_count_rows(&csv_path, &snapshot_path, use_snapshot)
        })
        .await
        .map_err(|e| TfbsError::Other(format!("Count table read task failed: {}", e)))?
    }
}

fn load_count_rows(csv_path: &Path, snapshot_path: &Path, use_snapshot: bool) -> Result<Vec<CountRow>> {
    if use_snapshot && snapshot::is_fresh(snapshot_path, csv_path) {
        match snapshot::read_snapshot(snapshot_path) {
            Ok(rows) => {
                info!("Loaded count table snapshot {}", snapshot_path.display());
                return Ok(rows);
            }
            Err(e) => warn!("Snapshot load failed ({}), falling back to CSV", e),
        }
    }

    if !csv_path.exists() {
        debug!("No count table at {}", csv_path.display());
        return Ok(Vec::new());
    }

    info!("Parsing count table {}", csv_path.display());
    let rows = read_count_file(csv_path)?;

    if use_snapshot {
        match snapshot::write_snapshot(snapshot_path, &rows) {
            Ok(()) => info!("Saved count table snapshot {}", snapshot_path.display()),
            Err(e) => warn!("Could not save count table snapshot: {}", e),
        }
    }

    Ok(rows)
}

fn read_count_file(path: &Path) -> Result<Vec<CountRow>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| TfbsError::Csv {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for raw in reader.deserialize::<RawCountRow>() {
        match raw.ok().and_then(RawCountRow::into_count_rows) {
            Some(split) if !split.is_empty() => rows.extend(split),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Skipped {} malformed rows in {}", skipped, path.display());
    }
    Ok(rows)
}

/// Read the cell/tissue labels offered for a species.
///
/// A missing or unreadable list yields no labels.
pub async fn read_cell_tissues(layout: &SourceLayout, species: Species) -> Vec<String> {
    let path = layout.cell_tissue_file(species);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Vec::new();
    }

    let result = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(&path)?;
        let headers = reader.headers()?.clone();
        let Some(column) = headers.iter().position(|h| h == "cell_tissue") else {
            return Ok(Vec::new());
        };
        let mut labels = Vec::new();
        for record in reader.records() {
            if let Some(label) = record?.get(column).filter(|l| !l.is_empty()) {
                labels.push(label.to_string());
            }
        }
        Ok(labels)
    })
    .await;

    match result {
        Ok(Ok(labels)) => labels,
        Ok(Err(e)) => {
            warn!("Failed to read cell/tissue list for {}: {}", species, e);
            Vec::new()
        }
        Err(e) => {
            warn!("Cell/tissue read task failed: {}", e);
            Vec::new()
        }
    }
}
