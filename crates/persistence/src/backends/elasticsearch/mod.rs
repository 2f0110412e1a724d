//! Elasticsearch search mirror.
//!
//! Records are indexed as whole JSON documents, one index per record type
//! (`staticpage`, `helpapp`, `contactus`, optionally prefixed), with the
//! record identifier as the document id. Free-text queries use a
//! `query_string` query.
//!
//! # Example
//!
//! ```ignore
//! use danak_persistence::backends::elasticsearch::{ElasticsearchBackend, ElasticsearchConfig};
//!
//! let config = ElasticsearchConfig {
//!     nodes: vec!["http://localhost:9200".to_string()],
//!     ..Default::default()
//! };
//! let index = ElasticsearchBackend::new(config)?;
//! ```

mod backend;
mod index;

pub use backend::{ElasticsearchAuth, ElasticsearchBackend, ElasticsearchConfig};
