//! Shared fixtures: a seeded data directory and a call-counting store.

#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tfbspedia_core::config::PathsConfig;
use tfbspedia_core::query::StoreQuery;
use tfbspedia_core::store::ensure_schema;
use tfbspedia_core::{
    CountEntry, PageWindow, RecordDetails, RecordId, RecordScores, RecordStore, Result, Species,
    SqliteStore, TfbsApi, TfbsRecord,
};

/// Human records:
///
/// | id  | locus           | direct | predicted |
/// |-----|-----------------|--------|-----------|
/// | 10  | chr1:100-200    | CTCF   |           |
/// | 11  | chr1:300-400    | CTCF   | GATA1     |
/// | 12  | chr1:500-600    | CTCF   | CTCF      |
/// | 13  | chr1:700-800    |        | CTCF      |
/// | 14  | chr2:100-200    | GATA1  |           |
/// | 100 | chr3:1000-1100  | GATA1  |           |
/// | 100 |                 | FOXA1  |           |
/// | 101 | chr3:5000-5100  | FOXA1  |           |
const HUMAN_ROWS: &str = r#"
    INSERT INTO tfbs_position (id, seqnames, start, "end") VALUES
        (10, 'chr1', 100, 200),
        (11, 'chr1', 300, 400),
        (12, 'chr1', 500, 600),
        (13, 'chr1', 700, 800),
        (14, 'chr2', 100, 200),
        (100, 'chr3', 1000, 1100),
        (101, 'chr3', 5000, 5100);
    INSERT INTO tfbs_name (id, tfbs, predicted_tfbs) VALUES
        (10, 'CTCF', NULL),
        (11, 'CTCF', 'GATA1'),
        (12, 'CTCF', 'CTCF'),
        (13, NULL, 'CTCF'),
        (14, 'GATA1', NULL),
        (100, 'GATA1', NULL),
        (100, 'FOXA1', NULL),
        (101, 'FOXA1', NULL);
    INSERT INTO tfbs_cell_or_tissue (id, cell_tissue) VALUES
        (10, 'HepG2'), (11, 'HepG2'), (12, 'HepG2'), (12, 'K562'), (13, 'K562');
    INSERT INTO tfbs_name_counts (tfbs, all_count, tfbs_count, predicted_tfbs_count) VALUES
        ('CTCF', 4, 3, 2),
        ('GATA1', 3, 2, 1),
        ('FOXA1', 2, 2, 0);
    INSERT INTO tfbs_confident_score (id, confident_score) VALUES (10, 0.91), (11, 0.42);
    INSERT INTO tfbs_importance_score (id, importance_score) VALUES (10, 2.5);
"#;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Data directory with a seeded human database and matching source files.
pub fn seeded_data_dir() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let db_path = temp.path().join(PathsConfig::database_file_name(Species::Human));
    let conn = Connection::open(&db_path).unwrap();
    ensure_schema(&conn).unwrap();
    conn.execute_batch(HUMAN_ROWS).unwrap();

    let docs = temp.path().join(PathsConfig::DOCUMENTS_DIR_NAME);
    write(&docs.join("cell_lines_ID_human/HepG2.csv"), "ID\n10\n11\n12\n");
    write(&docs.join("cell_lines_ID_human/K562.csv"), "ID\n12\n13\n");
    write(
        &docs.join("cell_line_TF_count_human.csv"),
        "cell_tissue,TFBS,predicted_TFBS,count_of_id\n\
         HepG2,CTCF,,3\n\
         HepG2,,GATA1,1\n\
         K562,,CTCF,2\n",
    );
    write(
        &docs.join("cell_tissue_unique_human.csv"),
        "cell_tissue\nHepG2\nK562\n",
    );

    temp
}

/// Records every store call so tests can assert on store traffic.
pub struct CountingStore {
    inner: SqliteStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn open(data_dir: &Path) -> Self {
        let inner = SqliteStore::new()
            .with_database(
                Species::Human,
                data_dir.join(PathsConfig::database_file_name(Species::Human)),
            )
            .unwrap();
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn count(&self, query: &StoreQuery) -> Result<u64> {
        self.hit();
        self.inner.count(query).await
    }

    async fn fetch_page(&self, query: &StoreQuery, window: PageWindow) -> Result<Vec<TfbsRecord>> {
        self.hit();
        self.inner.fetch_page(query, window).await
    }

    async fn matching_ids(&self, query: &StoreQuery) -> Result<Vec<RecordId>> {
        self.hit();
        self.inner.matching_ids(query).await
    }

    async fn fetch_records(&self, species: Species, ids: &[RecordId]) -> Result<Vec<TfbsRecord>> {
        self.hit();
        self.inner.fetch_records(species, ids).await
    }

    async fn factor_totals(&self, species: Species, factor: &str) -> Result<Option<CountEntry>> {
        self.hit();
        self.inner.factor_totals(species, factor).await
    }

    async fn fetch_scores(
        &self,
        species: Species,
        ids: &[RecordId],
    ) -> Result<HashMap<RecordId, RecordScores>> {
        self.hit();
        self.inner.fetch_scores(species, ids).await
    }

    async fn factor_names(&self, species: Species, fragment: &str, limit: usize) -> Result<Vec<String>> {
        self.hit();
        self.inner.factor_names(species, fragment, limit).await
    }

    async fn record_details(&self, species: Species, id: RecordId) -> Result<Option<RecordDetails>> {
        self.hit();
        self.inner.record_details(species, id).await
    }
}

/// API over a seeded directory with the store wrapped in a counter.
pub fn counting_api(data_dir: &TempDir) -> (TfbsApi, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::open(data_dir.path()));
    let api = TfbsApi::builder(data_dir.path())
        .with_store(store.clone())
        .build()
        .unwrap();
    (api, store)
}

pub fn ids(records: &[TfbsRecord]) -> Vec<RecordId> {
    records.iter().map(|r| r.id).collect()
}
