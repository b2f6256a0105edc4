//! SQLite record store, one database file per species.
//!
//! Every call runs on the blocking pool under the configured query timeout.
//! Identifier-set restrictions are bound as a single JSON array parameter
//! and expanded with `json_each`, so sets of any size compose with the
//! coordinate and name predicates without building huge `IN (...)` lists.

use super::RecordStore;
use crate::config::StoreConfig;
use crate::error::{Result, TfbsError};
use crate::models::{
    CountEntry, EvidenceType, PageWindow, RecordDetails, RecordId, RecordScores, SearchTarget,
    Species, TfbsRecord,
};
use crate::query::StoreQuery;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Create the record tables and indexes if they do not exist.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS tfbs_position (
            id INTEGER PRIMARY KEY,
            seqnames TEXT NOT NULL,
            start INTEGER NOT NULL,
            "end" INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_position_locus
            ON tfbs_position(seqnames, start, "end");

        CREATE TABLE IF NOT EXISTS tfbs_name (
            id INTEGER NOT NULL,
            tfbs TEXT,
            predicted_tfbs TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_name_id ON tfbs_name(id);
        CREATE INDEX IF NOT EXISTS idx_name_tfbs ON tfbs_name(tfbs);
        CREATE INDEX IF NOT EXISTS idx_name_predicted ON tfbs_name(predicted_tfbs);

        CREATE TABLE IF NOT EXISTS tfbs_cell_or_tissue (
            id INTEGER NOT NULL,
            cell_tissue TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_cell_tissue_id ON tfbs_cell_or_tissue(id);

        CREATE TABLE IF NOT EXISTS tfbs_name_counts (
            tfbs TEXT PRIMARY KEY,
            all_count INTEGER NOT NULL DEFAULT 0,
            tfbs_count INTEGER NOT NULL DEFAULT 0,
            predicted_tfbs_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tfbs_confident_score (
            id INTEGER PRIMARY KEY,
            confident_score REAL
        );

        CREATE TABLE IF NOT EXISTS tfbs_importance_score (
            id INTEGER PRIMARY KEY,
            importance_score REAL
        );
        "#,
    )?;
    Ok(())
}

struct SpeciesDb {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

/// SQLite implementation of [`RecordStore`].
pub struct SqliteStore {
    databases: HashMap<Species, SpeciesDb>,
    query_timeout: Duration,
}

impl Default for SqliteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteStore {
    /// Store with no databases attached.
    pub fn new() -> Self {
        Self {
            databases: HashMap::new(),
            query_timeout: StoreConfig::QUERY_TIMEOUT,
        }
    }

    /// Set the per-call timeout.
    ///
    /// Default: `StoreConfig::QUERY_TIMEOUT`
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Attach the database for one species, creating the file and schema
    /// if needed.
    pub fn with_database(mut self, species: Species, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let conn = Self::open_connection(&path)?;
        info!("Opened {} record store at {}", species, path.display());
        self.databases.insert(
            species,
            SpeciesDb {
                path,
                conn: Arc::new(Mutex::new(conn)),
            },
        );
        Ok(self)
    }

    pub fn has_database(&self, species: Species) -> bool {
        self.databases.contains_key(&species)
    }

    pub fn database_path(&self, species: Species) -> Option<&Path> {
        self.databases.get(&species).map(|db| db.path.as_path())
    }

    fn open_connection(path: &Path) -> Result<Connection> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| TfbsError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(StoreConfig::SQLITE_PRAGMAS)?;
        ensure_schema(&conn)?;
        Ok(conn)
    }

    /// Run `f` against the species connection on the blocking pool.
    async fn run<T, F>(&self, species: Species, label: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = self
            .databases
            .get(&species)
            .ok_or_else(|| TfbsError::store(format!("No record store configured for {}", species)))?;
        let conn = Arc::clone(&db.conn);

        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| TfbsError::store("Failed to acquire connection lock"))?;
            f(&conn)
        });

        let result = match tokio::time::timeout(self.query_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(TfbsError::store(format!("Store task failed: {}", e))),
            Err(_) => Err(TfbsError::StoreTimeout(self.query_timeout)),
        };

        match &result {
            Ok(_) => debug!("{} on {} took {:?}", label, species, started.elapsed()),
            Err(e) => error!("{} on {} failed: {}", label, species, e),
        }
        result
    }

    /// WHERE clause and bound parameters for a query's predicate set.
    fn where_clause(query: &StoreQuery) -> Result<(String, Vec<Box<dyn ToSql>>)> {
        let mut parts: Vec<String> = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        match &query.target {
            SearchTarget::Location(region) => {
                parts.push("p.seqnames = ?".to_string());
                params_vec.push(Box::new(region.chromosome.clone()));
                if let Some((start, end)) = region.bounds() {
                    parts.push(r#"p.start >= ? AND p."end" <= ?"#.to_string());
                    params_vec.push(Box::new(start));
                    params_vec.push(Box::new(end));
                }
            }
            SearchTarget::Name(name) => {
                let (condition, binds) = match query.evidence {
                    EvidenceType::All => ("(n.tfbs = ? OR n.predicted_tfbs = ?)", 2),
                    EvidenceType::Direct => ("n.tfbs = ?", 1),
                    EvidenceType::Predicted => ("n.predicted_tfbs = ?", 1),
                };
                parts.push(format!(
                    "EXISTS (SELECT 1 FROM tfbs_name n WHERE n.id = p.id AND {})",
                    condition
                ));
                for _ in 0..binds {
                    params_vec.push(Box::new(name.clone()));
                }
            }
        }

        if let Some(set) = &query.restriction {
            parts.push("p.id IN (SELECT value FROM json_each(?))".to_string());
            params_vec.push(Box::new(serde_json::to_string(set.ids())?));
        }

        Ok((format!("WHERE {}", parts.join(" AND ")), params_vec))
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<TfbsRecord> {
        Ok(TfbsRecord {
            id: row.get(0)?,
            chromosome: row.get(1)?,
            start: row.get(2)?,
            end: row.get(3)?,
        })
    }

    fn collect_records(
        conn: &Connection,
        sql: &str,
        params_vec: &[Box<dyn ToSql>],
    ) -> Result<Vec<TfbsRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), Self::row_to_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn ids_json(ids: &[RecordId]) -> Result<String> {
        Ok(serde_json::to_string(ids)?)
    }
}

/// Convert a window bound to SQLite's signed integer without wrapping.
fn sql_bound(value: usize, name: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| TfbsError::invalid("page", format!("{} {} is out of range", name, value)))
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern.
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

const RECORD_COLUMNS: &str = r#"p.id, p.seqnames, p.start, p."end""#;

#[async_trait]
impl RecordStore for SqliteStore {
    async fn count(&self, query: &StoreQuery) -> Result<u64> {
        let query = query.clone();
        self.run(query.species, "count", move |conn| {
            let (where_sql, params_vec) = Self::where_clause(&query)?;
            let sql = format!("SELECT COUNT(*) FROM tfbs_position p {}", where_sql);
            let mut stmt = conn.prepare(&sql)?;
            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
            let total: i64 = stmt.query_row(params_refs.as_slice(), |row| row.get(0))?;
            Ok(total.max(0) as u64)
        })
        .await
    }

    async fn fetch_page(&self, query: &StoreQuery, window: PageWindow) -> Result<Vec<TfbsRecord>> {
        let query = query.clone();
        self.run(query.species, "fetch_page", move |conn| {
            let (where_sql, mut params_vec) = Self::where_clause(&query)?;
            let sql = format!(
                "SELECT {} FROM tfbs_position p {} ORDER BY p.id LIMIT ? OFFSET ?",
                RECORD_COLUMNS, where_sql
            );
            params_vec.push(Box::new(sql_bound(window.limit(), "limit")?));
            params_vec.push(Box::new(sql_bound(window.offset(), "offset")?));
            Self::collect_records(conn, &sql, &params_vec)
        })
        .await
    }

    async fn matching_ids(&self, query: &StoreQuery) -> Result<Vec<RecordId>> {
        let query = query.clone();
        self.run(query.species, "matching_ids", move |conn| {
            let (where_sql, params_vec) = Self::where_clause(&query)?;
            let sql = format!("SELECT p.id FROM tfbs_position p {} ORDER BY p.id", where_sql);
            let mut stmt = conn.prepare(&sql)?;
            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
            let ids = stmt
                .query_map(params_refs.as_slice(), |row| row.get::<_, RecordId>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn fetch_records(&self, species: Species, ids: &[RecordId]) -> Result<Vec<TfbsRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids_json = Self::ids_json(ids)?;
        self.run(species, "fetch_records", move |conn| {
            let sql = format!(
                "SELECT {} FROM tfbs_position p \
                 WHERE p.id IN (SELECT value FROM json_each(?)) ORDER BY p.id",
                RECORD_COLUMNS
            );
            let params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(ids_json)];
            Self::collect_records(conn, &sql, &params_vec)
        })
        .await
    }

    async fn factor_totals(&self, species: Species, factor: &str) -> Result<Option<CountEntry>> {
        let factor = factor.to_string();
        self.run(species, "factor_totals", move |conn| {
            let entry = conn
                .query_row(
                    "SELECT all_count, tfbs_count, predicted_tfbs_count \
                     FROM tfbs_name_counts WHERE tfbs = ?1",
                    params![factor],
                    |row| {
                        Ok(CountEntry {
                            all: row.get::<_, i64>(0)?.max(0) as u64,
                            direct: row.get::<_, i64>(1)?.max(0) as u64,
                            predicted: row.get::<_, i64>(2)?.max(0) as u64,
                        })
                    },
                )
                .optional()?;
            Ok(entry)
        })
        .await
    }

    async fn fetch_scores(
        &self,
        species: Species,
        ids: &[RecordId],
    ) -> Result<HashMap<RecordId, RecordScores>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids_json = Self::ids_json(ids)?;
        self.run(species, "fetch_scores", move |conn| {
            let mut scores: HashMap<RecordId, RecordScores> = HashMap::new();

            let mut stmt = conn.prepare(
                "SELECT id, confident_score FROM tfbs_confident_score \
                 WHERE id IN (SELECT value FROM json_each(?1))",
            )?;
            let rows = stmt.query_map(params![ids_json], |row| {
                Ok((row.get::<_, RecordId>(0)?, row.get::<_, Option<f64>>(1)?))
            })?;
            for row in rows {
                let (id, score) = row?;
                scores.entry(id).or_default().confident = score;
            }

            let mut stmt = conn.prepare(
                "SELECT id, importance_score FROM tfbs_importance_score \
                 WHERE id IN (SELECT value FROM json_each(?1))",
            )?;
            let rows = stmt.query_map(params![ids_json], |row| {
                Ok((row.get::<_, RecordId>(0)?, row.get::<_, Option<f64>>(1)?))
            })?;
            for row in rows {
                let (id, score) = row?;
                scores.entry(id).or_default().importance = score;
            }

            Ok(scores)
        })
        .await
    }

    async fn factor_names(
        &self,
        species: Species,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let pattern = format!("%{}%", escape_like(&fragment.trim().to_lowercase()));
        self.run(species, "factor_names", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT tfbs FROM tfbs_name_counts \
                 WHERE LOWER(tfbs) LIKE ?1 ESCAPE '\\' \
                 ORDER BY tfbs LIMIT ?2",
            )?;
            let names = stmt
                .query_map(params![pattern, sql_bound(limit, "limit")?], |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        })
        .await
    }

    async fn record_details(&self, species: Species, id: RecordId) -> Result<Option<RecordDetails>> {
        self.run(species, "record_details", move |conn| {
            let record = conn
                .query_row(
                    &format!("SELECT {} FROM tfbs_position p WHERE p.id = ?1", RECORD_COLUMNS),
                    params![id],
                    Self::row_to_record,
                )
                .optional()?;
            let Some(record) = record else {
                return Ok(None);
            };

            let mut direct = Vec::new();
            let mut predicted = Vec::new();
            let mut stmt = conn.prepare(
                "SELECT tfbs, predicted_tfbs FROM tfbs_name WHERE id = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![id], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            for row in rows {
                let (tfbs, predicted_tfbs) = row?;
                direct.extend(tfbs);
                predicted.extend(predicted_tfbs);
            }

            let mut stmt = conn.prepare(
                "SELECT DISTINCT cell_tissue FROM tfbs_cell_or_tissue \
                 WHERE id = ?1 AND cell_tissue IS NOT NULL ORDER BY cell_tissue",
            )?;
            let cell_tissues = stmt
                .query_map(params![id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let confident = conn
                .query_row(
                    "SELECT confident_score FROM tfbs_confident_score WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, Option<f64>>(0),
                )
                .optional()?
                .flatten();
            let importance = conn
                .query_row(
                    "SELECT importance_score FROM tfbs_importance_score WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, Option<f64>>(0),
                )
                .optional()?
                .flatten();

            let join = |names: Vec<String>| (!names.is_empty()).then(|| names.join(", "));
            Ok(Some(RecordDetails {
                record,
                direct_factors: join(direct),
                predicted_factors: join(predicted),
                cell_tissues,
                scores: RecordScores {
                    confident,
                    importance,
                },
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::IdentifierSet;
    use crate::models::GenomicRegion;
    use tempfile::TempDir;

    fn seeded_store(temp: &TempDir) -> SqliteStore {
        let path = temp.path().join("human.db");
        let store = SqliteStore::new()
            .with_database(Species::Human, &path)
            .unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO tfbs_position (id, seqnames, start, "end") VALUES
                (1, 'chr1', 100, 200),
                (2, 'chr1', 150, 260),
                (3, 'chr1', 500, 600),
                (4, 'chr2', 100, 200);
            INSERT INTO tfbs_name (id, tfbs, predicted_tfbs) VALUES
                (1, 'CTCF', NULL),
                (2, NULL, 'CTCF'),
                (3, 'GATA1', 'CTCF'),
                (3, 'FOXA1', NULL),
                (4, 'FOXA1', NULL);
            INSERT INTO tfbs_cell_or_tissue (id, cell_tissue) VALUES
                (3, 'K562'), (3, 'HepG2'), (3, 'K562');
            INSERT INTO tfbs_name_counts VALUES
                ('CTCF', 3, 1, 2), ('GATA1', 1, 1, 0), ('FOXA1', 2, 2, 0), ('my_tf', 1, 1, 0);
            INSERT INTO tfbs_confident_score VALUES (1, 0.9), (3, 0.4);
            INSERT INTO tfbs_importance_score VALUES (3, 1.5);
            "#,
        )
        .unwrap();
        store
    }

    fn query(target: SearchTarget, evidence: EvidenceType) -> StoreQuery {
        StoreQuery {
            species: Species::Human,
            target,
            evidence,
            restriction: None,
        }
    }

    #[tokio::test]
    async fn test_location_containment() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let ranged = query(
            SearchTarget::Location(GenomicRegion::range("chr1", 100, 300)),
            EvidenceType::All,
        );
        assert_eq!(store.count(&ranged).await.unwrap(), 2);
        let ids: Vec<_> = store
            .fetch_page(&ranged, PageWindow::default())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);

        let whole = query(
            SearchTarget::Location(GenomicRegion::chromosome("chr1")),
            EvidenceType::All,
        );
        assert_eq!(store.matching_ids(&whole).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_name_evidence_columns() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);
        let ctcf = || SearchTarget::Name("CTCF".into());

        assert_eq!(
            store.matching_ids(&query(ctcf(), EvidenceType::All)).await.unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(
            store.matching_ids(&query(ctcf(), EvidenceType::Direct)).await.unwrap(),
            vec![1]
        );
        assert_eq!(
            store.matching_ids(&query(ctcf(), EvidenceType::Predicted)).await.unwrap(),
            vec![2, 3]
        );
    }

    #[tokio::test]
    async fn test_restriction_and_paging() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let mut restricted = query(SearchTarget::Name("CTCF".into()), EvidenceType::All);
        restricted.restriction = Some(IdentifierSet::new(Species::Human, "HepG2", [2, 3, 4]));
        assert_eq!(store.count(&restricted).await.unwrap(), 2);

        let first = store
            .fetch_page(&restricted, PageWindow::new(0, 1).unwrap())
            .await
            .unwrap();
        let second = store
            .fetch_page(&restricted, PageWindow::new(1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(first[0].id, 2);
        assert_eq!(second[0].id, 3);
    }

    #[tokio::test]
    async fn test_fetch_records_and_scores() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let records = store.fetch_records(Species::Human, &[4, 1, 99]).await.unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 4]);

        let scores = store.fetch_scores(Species::Human, &[1, 2, 3]).await.unwrap();
        assert_eq!(scores[&1].confident, Some(0.9));
        assert_eq!(scores[&1].importance, None);
        assert_eq!(scores[&3].importance, Some(1.5));
        assert!(!scores.contains_key(&2));
    }

    #[tokio::test]
    async fn test_factor_totals_and_names() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let ctcf = store.factor_totals(Species::Human, "CTCF").await.unwrap().unwrap();
        assert_eq!((ctcf.all, ctcf.direct, ctcf.predicted), (3, 1, 2));
        assert!(store.factor_totals(Species::Human, "NOPE").await.unwrap().is_none());

        assert_eq!(
            store.factor_names(Species::Human, "fo", 20).await.unwrap(),
            vec!["FOXA1".to_string()]
        );
        // Underscore is literal, not a wildcard.
        assert_eq!(
            store.factor_names(Species::Human, "y_", 20).await.unwrap(),
            vec!["my_tf".to_string()]
        );
        assert_eq!(store.factor_names(Species::Human, "", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_details() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let details = store.record_details(Species::Human, 3).await.unwrap().unwrap();
        assert_eq!(details.record.chromosome, "chr1");
        assert_eq!(details.direct_factors.as_deref(), Some("GATA1, FOXA1"));
        assert_eq!(details.predicted_factors.as_deref(), Some("CTCF"));
        assert_eq!(details.cell_tissues, vec!["HepG2".to_string(), "K562".to_string()]);
        assert_eq!(details.scores.importance, Some(1.5));

        assert!(store.record_details(Species::Human, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_species_is_store_error() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let err = store
            .count(&StoreQuery {
                species: Species::Mouse,
                target: SearchTarget::Name("Ctcf".into()),
                evidence: EvidenceType::All,
                restriction: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_store_error());
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp).with_query_timeout(Duration::from_millis(20));

        let err = store
            .run(Species::Human, "sleep", |_| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TfbsError::StoreTimeout(_)));
    }

    #[tokio::test]
    async fn test_offset_past_row_range_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);
        let whole = query(
            SearchTarget::Location(GenomicRegion::chromosome("chr1")),
            EvidenceType::All,
        );

        let last = PageWindow::new(i64::MAX as usize, 2).unwrap();
        assert!(store.fetch_page(&whole, last).await.unwrap().is_empty());

        let err = store.fetch_page(&whole, last.next()).await.unwrap_err();
        assert!(matches!(err, TfbsError::InvalidArgument { .. }));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a_b%c\\"), "a\\_b\\%c\\\\");
    }
}
