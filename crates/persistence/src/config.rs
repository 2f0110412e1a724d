//! Persistence configuration.
//!
//! A [`PersistenceConfig`] names the primary store and the search mirror.
//! It can be built programmatically, deserialized, or read from the
//! environment with [`PersistenceConfig::from_env`].
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DANAK_DATABASE_PATH` | `:memory:` | SQLite file of the primary store |
//! | `DANAK_MAX_CONNECTIONS` | 10 | Primary store pool size |
//! | `DANAK_SEARCH_BACKEND` | `sqlite` | `sqlite` or `elasticsearch` |
//! | `DANAK_SEARCH_PATH` | unset | SQLite file of the FTS5 mirror; unset shares the primary database |
//! | `DANAK_ES_NODES` | `http://localhost:9200` | Comma-separated node URLs |
//! | `DANAK_ES_INDEX_PREFIX` | empty | Prefix for index names |
//! | `DANAK_ES_USERNAME` | unset | Basic auth user |
//! | `DANAK_ES_PASSWORD` | unset | Basic auth password |
//!
//! # Example
//!
//! ```no_run
//! use danak_persistence::config::PersistenceConfig;
//! use danak_persistence::model::StaticPage;
//!
//! # async fn run() -> danak_persistence::StorageResult<()> {
//! let stores = PersistenceConfig::from_env()?.open()?;
//! let (pages, queries) = stores.services::<StaticPage>();
//! let all = queries.find_by_criteria(&Default::default()).await?;
//! # let _ = (pages, all);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use crate::core::{RecordStorage, SearchIndex};
use crate::error::{StorageResult, ValidationError};
use crate::model::Record;
use crate::service::{EntityService, MirrorTracker, QueryService};

#[cfg(feature = "elasticsearch")]
use crate::backends::elasticsearch::{ElasticsearchAuth, ElasticsearchBackend, ElasticsearchConfig};

const IN_MEMORY: &str = ":memory:";

/// Where the search mirror lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchBackendConfig {
    /// FTS5 table in a SQLite database. `None` places it in the primary
    /// database.
    #[serde(rename = "sqlite")]
    SqliteFts {
        #[serde(default)]
        path: Option<PathBuf>,
    },

    /// Elasticsearch cluster.
    #[cfg(feature = "elasticsearch")]
    Elasticsearch(ElasticsearchConfig),
}

impl Default for SearchBackendConfig {
    fn default() -> Self {
        SearchBackendConfig::SqliteFts { path: None }
    }
}

/// Configuration of the primary store and the search mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite file of the primary store, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default)]
    pub sqlite: SqliteBackendConfig,

    #[serde(default)]
    pub search: SearchBackendConfig,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(IN_MEMORY)
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            sqlite: SqliteBackendConfig::default(),
            search: SearchBackendConfig::default(),
        }
    }
}

impl PersistenceConfig {
    /// Reads the configuration from `DANAK_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StorageResult<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("DANAK_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("DANAK_MAX_CONNECTIONS") {
            config.sqlite.max_connections = value
                .parse()
                .ok()
                .filter(|&n: &u32| n > 0)
                .ok_or_else(|| ValidationError::InvalidConfiguration {
                    key: "DANAK_MAX_CONNECTIONS".to_string(),
                    message: format!("'{}' is not a positive integer", value),
                })?;
        }

        let backend = lookup("DANAK_SEARCH_BACKEND").unwrap_or_else(|| "sqlite".to_string());
        config.search = match backend.as_str() {
            "sqlite" => SearchBackendConfig::SqliteFts {
                path: lookup("DANAK_SEARCH_PATH").map(PathBuf::from),
            },
            #[cfg(feature = "elasticsearch")]
            "elasticsearch" => SearchBackendConfig::Elasticsearch(elasticsearch_from_lookup(&lookup)),
            other => {
                return Err(ValidationError::InvalidConfiguration {
                    key: "DANAK_SEARCH_BACKEND".to_string(),
                    message: format!("unsupported search backend '{}'", other),
                }
                .into());
            }
        };

        Ok(config)
    }

    /// Opens the primary store and the search mirror, creating their schemas.
    pub fn open(&self) -> StorageResult<Stores> {
        let primary = Arc::new(SqliteBackend::with_config(
            &self.database_path,
            self.sqlite.clone(),
        )?);
        primary.init_schema()?;

        let search = match &self.search {
            SearchBackendConfig::SqliteFts { path: None } => SearchStore::Sqlite(Arc::clone(&primary)),
            SearchBackendConfig::SqliteFts { path: Some(path) } => {
                let index = SqliteBackend::with_config(path, self.sqlite.clone())?;
                index.init_schema()?;
                SearchStore::Sqlite(Arc::new(index))
            }
            #[cfg(feature = "elasticsearch")]
            SearchBackendConfig::Elasticsearch(config) => {
                SearchStore::Elasticsearch(Arc::new(ElasticsearchBackend::new(config.clone())?))
            }
        };

        Ok(Stores {
            primary,
            search,
            mirrors: Arc::default(),
        })
    }
}

#[cfg(feature = "elasticsearch")]
fn elasticsearch_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> ElasticsearchConfig {
    let mut config = ElasticsearchConfig::default();
    if let Some(nodes) = lookup("DANAK_ES_NODES") {
        config.nodes = nodes
            .split(',')
            .map(str::trim)
            .filter(|node| !node.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(prefix) = lookup("DANAK_ES_INDEX_PREFIX") {
        config.index_prefix = prefix;
    }
    if let (Some(username), Some(password)) =
        (lookup("DANAK_ES_USERNAME"), lookup("DANAK_ES_PASSWORD"))
    {
        config.auth = Some(ElasticsearchAuth::Basic { username, password });
    }
    config
}

/// An opened search mirror.
#[derive(Debug, Clone)]
pub enum SearchStore {
    Sqlite(Arc<SqliteBackend>),
    #[cfg(feature = "elasticsearch")]
    Elasticsearch(Arc<ElasticsearchBackend>),
}

impl SearchStore {
    /// The mirror for one record type.
    pub fn index<R: Record>(&self) -> Arc<dyn SearchIndex<R>> {
        match self {
            SearchStore::Sqlite(backend) => Arc::clone(backend) as Arc<dyn SearchIndex<R>>,
            #[cfg(feature = "elasticsearch")]
            SearchStore::Elasticsearch(backend) => Arc::clone(backend) as Arc<dyn SearchIndex<R>>,
        }
    }
}

/// The opened primary store and search mirror.
///
/// Services built from the same `Stores` share one mirror status per record
/// type.
#[derive(Debug, Clone)]
pub struct Stores {
    pub primary: Arc<SqliteBackend>,
    pub search: SearchStore,
    mirrors: Arc<Mutex<HashMap<&'static str, MirrorTracker>>>,
}

impl Stores {
    /// Builds the entity and query services for one record type.
    pub fn services<R: Record>(&self) -> (EntityService<R>, QueryService<R>) {
        let storage: Arc<dyn RecordStorage<R>> = self.primary.clone();
        let mirror = self
            .mirrors
            .lock()
            .entry(R::resource_type())
            .or_default()
            .clone();

        let entities = EntityService::with_tracker(Arc::clone(&storage), self.search.index(), mirror);
        let queries = QueryService::new(storage);
        (entities, queries)
    }
}
