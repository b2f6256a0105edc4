//! Builder for configuring TfbsApi initialization.

use crate::cache::{CountIndexCache, IdentifierSetCache};
use crate::config::{PathsConfig, StoreConfig};
use crate::error::{Result, TfbsError};
use crate::models::Species;
use crate::search::{BatchSearchEngine, SearchEngine};
use crate::sources::{CountSource, CsvCountSource, CsvIdSource, IdSource, SourceLayout};
use crate::store::{RecordStore, SqliteStore};
use crate::TfbsApi;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Builder for configuring TfbsApi initialization.
///
/// The data directory holds one `tfbspedia_{species}.db` per species and a
/// `documents/` directory with the precomputed identifier and count files.
///
/// # Example
///
/// ```rust,ignore
/// use tfbspedia_core::{Species, TfbsApi};
///
/// let api = TfbsApi::builder("/srv/tfbspedia")
///     .database(Species::Mouse, "/mnt/fast/mouse.db")
///     .query_timeout(std::time::Duration::from_secs(10))
///     .build()?;
/// ```
pub struct TfbsApiBuilder {
    data_dir: PathBuf,
    databases: HashMap<Species, PathBuf>,
    query_timeout: Duration,
    use_snapshot: bool,
    store: Option<Arc<dyn RecordStore>>,
    id_source: Option<Arc<dyn IdSource>>,
    count_source: Option<Arc<dyn CountSource>>,
}

impl TfbsApiBuilder {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            databases: HashMap::new(),
            query_timeout: StoreConfig::QUERY_TIMEOUT,
            use_snapshot: true,
            store: None,
            id_source: None,
            count_source: None,
        }
    }

    /// Use an explicit database file for a species.
    ///
    /// Species without an explicit path use `{data_dir}/tfbspedia_{species}.db`
    /// when that file exists.
    pub fn database(mut self, species: Species, path: impl Into<PathBuf>) -> Self {
        self.databases.insert(species, path.into());
        self
    }

    /// Per-call store timeout.
    ///
    /// Default: `StoreConfig::QUERY_TIMEOUT` (30s)
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Enable or disable the count-table snapshot.
    ///
    /// Default: `true`
    pub fn with_snapshot(mut self, enable: bool) -> Self {
        self.use_snapshot = enable;
        self
    }

    /// Replace the SQLite store with another implementation.
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the CSV identifier-set source.
    pub fn with_id_source(mut self, source: Arc<dyn IdSource>) -> Self {
        self.id_source = Some(source);
        self
    }

    /// Replace the CSV count-table source.
    pub fn with_count_source(mut self, source: Arc<dyn CountSource>) -> Self {
        self.count_source = Some(source);
        self
    }

    fn open_store(&self) -> Result<SqliteStore> {
        let mut store = SqliteStore::new().with_query_timeout(self.query_timeout);
        for species in Species::ALL {
            let path = match self.databases.get(&species) {
                Some(path) => path.clone(),
                None => {
                    let default = self.data_dir.join(PathsConfig::database_file_name(species));
                    if !default.exists() {
                        warn!("No {} database at {}", species, default.display());
                        continue;
                    }
                    default
                }
            };
            store = store.with_database(species, path)?;
        }
        Ok(store)
    }

    /// Build the TfbsApi instance.
    pub fn build(self) -> Result<TfbsApi> {
        if !self.data_dir.is_dir() {
            return Err(TfbsError::Config {
                message: format!("Data directory does not exist: {}", self.data_dir.display()),
            });
        }

        let layout = SourceLayout::new(self.data_dir.join(PathsConfig::DOCUMENTS_DIR_NAME));

        let store: Arc<dyn RecordStore> = match &self.store {
            Some(store) => Arc::clone(store),
            None => Arc::new(self.open_store()?),
        };
        let id_source: Arc<dyn IdSource> = match &self.id_source {
            Some(source) => Arc::clone(source),
            None => Arc::new(CsvIdSource::new(layout.clone())),
        };
        let count_source: Arc<dyn CountSource> = match &self.count_source {
            Some(source) => Arc::clone(source),
            None => Arc::new(CsvCountSource::new(layout.clone()).with_snapshot(self.use_snapshot)),
        };

        let id_sets = Arc::new(IdentifierSetCache::new(id_source));
        let counts = Arc::new(CountIndexCache::new(count_source));
        let search = SearchEngine::new(Arc::clone(&store), Arc::clone(&id_sets), Arc::clone(&counts));
        let batch = BatchSearchEngine::new(Arc::clone(&store), Arc::clone(&id_sets));

        info!("TFBS API ready (data dir {})", self.data_dir.display());

        Ok(TfbsApi {
            data_dir: self.data_dir,
            layout,
            store,
            id_sets,
            counts,
            search,
            batch,
            started_at: chrono::Utc::now(),
        })
    }
}
