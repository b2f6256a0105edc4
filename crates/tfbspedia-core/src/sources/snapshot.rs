//! Bincode snapshot of a parsed count table.
//!
//! The snapshot is trusted only while it is at least as new as the CSV it was
//! built from. Writes go through a temp file in the same directory followed
//! by an atomic rename, so readers never observe a partial snapshot.

use super::CountRow;
use crate::error::{Result, TfbsError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;
use tempfile::NamedTempFile;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CountSnapshot {
    version: u32,
    rows: Vec<CountRow>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Whether `snapshot` exists and is not older than `source`.
///
/// A snapshot without a source is considered fresh.
pub(crate) fn is_fresh(snapshot: &Path, source: &Path) -> bool {
    match (modified(snapshot), modified(source)) {
        (Some(snap), Some(src)) => snap >= src,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

pub(crate) fn read_snapshot(path: &Path) -> Result<Vec<CountRow>> {
    let file = File::open(path).map_err(|e| TfbsError::io_with_path(e, path))?;
    let snapshot: CountSnapshot = bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| TfbsError::Other(format!("Invalid snapshot {}: {}", path.display(), e)))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(TfbsError::Other(format!(
            "Snapshot {} has version {}, expected {}",
            path.display(),
            snapshot.version,
            SNAPSHOT_VERSION
        )));
    }
    Ok(snapshot.rows)
}

pub(crate) fn write_snapshot(path: &Path, rows: &[CountRow]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| TfbsError::Other(format!("Snapshot path {} has no parent", path.display())))?;

    let temp = NamedTempFile::new_in(dir).map_err(|e| TfbsError::io_with_path(e, dir))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        let snapshot = CountSnapshot {
            version: SNAPSHOT_VERSION,
            rows: rows.to_vec(),
        };
        bincode::serialize_into(&mut writer, &snapshot)
            .map_err(|e| TfbsError::Other(format!("Failed to encode snapshot: {}", e)))?;
        writer.flush().map_err(|e| TfbsError::io_with_path(e, path))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| TfbsError::io_with_path(e, path))?;
    temp.persist(path)
        .map_err(|e| TfbsError::io_with_path(e.error, path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountEntry;
    use tempfile::TempDir;

    fn rows() -> Vec<CountRow> {
        vec![CountRow {
            cell_tissue: "HepG2".into(),
            factor: "CTCF".into(),
            counts: CountEntry {
                all: 6,
                direct: 5,
                predicted: 2,
            },
        }]
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("counts.bin");
        write_snapshot(&path, &rows()).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), rows());
    }

    #[test]
    fn test_freshness() {
        let temp = TempDir::new().unwrap();
        let csv = temp.path().join("counts.csv");
        let snap = temp.path().join("counts.bin");

        assert!(!is_fresh(&snap, &csv));

        std::fs::write(&csv, "cell_tissue\n").unwrap();
        write_snapshot(&snap, &rows()).unwrap();
        assert!(is_fresh(&snap, &csv));

        std::fs::remove_file(&csv).unwrap();
        assert!(is_fresh(&snap, &csv));
    }

    #[test]
    fn test_garbage_snapshot_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("counts.bin");
        std::fs::write(&path, b"\x01\x02").unwrap();
        assert!(read_snapshot(&path).is_err());
    }
}
