//! SQLite backend implementation.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, StorageError, StorageResult, ValidationError};

use super::schema;

pub(crate) const BACKEND_NAME: &str = "sqlite";

/// SQLite backend for record storage and full-text mirroring.
///
/// One value can serve as the primary store, the search mirror, or both.
/// Deployments normally open two databases so that the mirror can be
/// rebuilt independently of the records.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    is_memory: bool,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enforce the owning relation's foreign key.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(":memory:", SqliteBackendConfig::default())
    }

    /// Opens or creates a file-based SQLite database.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(path, SqliteBackendConfig::default())
    }

    /// Creates a backend with custom configuration.
    ///
    /// An in-memory database lives inside a single connection, so its pool
    /// is pinned to exactly one connection that is never recycled.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteBackendConfig,
    ) -> StorageResult<Self> {
        if config.max_connections == 0 {
            return Err(StorageError::Validation(
                ValidationError::InvalidConfiguration {
                    key: "max_connections".to_string(),
                    message: "the connection pool needs at least one connection".to_string(),
                },
            ));
        }

        let path_str = path.as_ref().to_string_lossy();
        let is_memory = path_str == ":memory:";

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let foreign_keys = config.enable_foreign_keys;
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if foreign_keys {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            }
            Ok(())
        });

        let mut builder = Pool::builder().connection_timeout(Duration::from_millis(
            config.connection_timeout_ms,
        ));
        builder = if is_memory {
            builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections.min(config.max_connections)))
        };

        let pool = builder.build(manager).map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })
        })?;

        let backend = Self {
            pool,
            config,
            is_memory,
        };

        backend.configure_connection()?;
        tracing::info!(path = %path_str, is_memory, "Opened SQLite backend");

        Ok(backend)
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(
        &self,
    ) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })
        })
    }

    /// Applies database-wide settings.
    fn configure_connection(&self) -> StorageResult<()> {
        if self.config.enable_wal && !self.is_memory {
            let conn = self.get_connection()?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| {
                StorageError::Backend(BackendError::Internal {
                    backend_name: BACKEND_NAME.to_string(),
                    message: format!("Failed to enable WAL mode: {}", e),
                    source: None,
                })
            })?;
        }

        Ok(())
    }

    /// Checks that a connection can be obtained and used.
    pub fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection().map_err(|_| {
            StorageError::Backend(BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: "Failed to get connection".to_string(),
            })
        })?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }
}
