//! Elasticsearch client and configuration.

use std::fmt::Debug;
use std::time::Duration;

use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, StorageError, StorageResult};

pub(crate) const BACKEND_NAME: &str = "elasticsearch";

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Configuration for the Elasticsearch search mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Elasticsearch node URLs (e.g., `["http://localhost:9200"]`).
    /// Currently uses the first node (single-node connection pool).
    pub nodes: Vec<String>,

    /// Optional index name prefix. With a prefix `p`, records of type
    /// `staticpage` go to index `p_staticpage`.
    #[serde(default)]
    pub index_prefix: String,

    /// Maximum number of hits returned by one search (default: 10000).
    #[serde(default = "default_max_result_window")]
    pub max_result_window: u32,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_max_result_window() -> u32 {
    10000
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["http://localhost:9200".to_string()],
            index_prefix: String::new(),
            max_result_window: default_max_result_window(),
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

/// Elasticsearch search mirror.
///
/// Holds one index per record type, one document per record, keyed by the
/// record's identifier.
pub struct ElasticsearchBackend {
    client: Elasticsearch,
    config: ElasticsearchConfig,
}

impl Debug for ElasticsearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchBackend {
    /// Creates a new Elasticsearch backend with the given configuration.
    pub fn new(config: ElasticsearchConfig) -> StorageResult<Self> {
        let client = Self::build_client(&config)?;
        tracing::info!(nodes = ?config.nodes, "Configured Elasticsearch search mirror");
        Ok(Self { client, config })
    }

    /// Builds the Elasticsearch client from configuration.
    fn build_client(config: &ElasticsearchConfig) -> StorageResult<Elasticsearch> {
        let url = config
            .nodes
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost:9200".to_string());

        let parsed_url: elasticsearch::http::Url = url.parse().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Invalid URL: {}", e),
            })
        })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticsearchAuth::Bearer { token } => {
                    builder.auth(Credentials::Bearer(token.clone()))
                }
            };
        }

        let transport = builder.build().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Failed to build transport: {}", e),
            })
        })?;

        Ok(Elasticsearch::new(transport))
    }

    pub(crate) fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// Returns the physical index name for a record type's index.
    pub fn index_name(&self, name: &str) -> String {
        if self.config.index_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.config.index_prefix, name)
        }
    }

    /// Makes recently indexed documents searchable.
    ///
    /// Elasticsearch refreshes on its own schedule, so a search issued right
    /// after a write may not see it.
    pub async fn refresh_index(&self, name: &str) -> StorageResult<()> {
        let index = self.index_name(name);
        self.client
            .indices()
            .refresh(elasticsearch::indices::IndicesRefreshParts::Index(&[
                &index,
            ]))
            .send()
            .await
            .map_err(|e| {
                internal_error(format!("Failed to refresh index {}: {}", index, e))
            })?;
        Ok(())
    }

    /// Checks that the cluster is reachable and not red.
    pub async fn health_check(&self) -> StorageResult<()> {
        let response = self
            .client
            .cluster()
            .health(elasticsearch::cluster::ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| {
                StorageError::Backend(BackendError::Unavailable {
                    backend_name: BACKEND_NAME.to_string(),
                    message: format!("Health check failed: {}", e),
                })
            })?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(StorageError::Backend(BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Cluster health returned status {}", status),
            }));
        }

        let body = response.json::<Value>().await?;
        if body.get("status").and_then(|s| s.as_str()) == Some("red") {
            return Err(StorageError::Backend(BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: "Cluster status is red".to_string(),
            }));
        }

        Ok(())
    }
}

pub(crate) fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
        source: None,
    })
}
