//! Danak persistence layer.
//!
//! This crate turns structured filter requests into store queries and keeps a
//! free-text search mirror in step with the primary store. It serves three
//! record types of the Danak admin backend: [`model::StaticPage`],
//! [`model::HelpApp`] and [`model::ContactUs`].
//!
//! # Architecture
//!
//! - [`model`] - The [`model::Record`] trait, per-type schemas and the records
//! - [`criteria`] - Filters, the criteria aggregate and the query-string parser
//! - [`query`] - The criteria compiler, SQL fragments and paging
//! - [`core`] - Storage and search-index traits
//! - [`backends`] - SQLite primary store and FTS5 mirror, Elasticsearch mirror
//! - [`service`] - Entity and query services
//! - [`config`] - Configuration and opening of the stores
//! - [`error`] - Error types for all operations
//!
//! # Features
//!
//! - `sqlite` (default) - SQLite primary store and FTS5 search mirror
//! - `elasticsearch` - Elasticsearch search mirror
//! - `cli` - The `danak-reindex` binary
//!
//! # Quick Start
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # async fn run() -> danak_persistence::StorageResult<()> {
//! use danak_persistence::config::PersistenceConfig;
//! use danak_persistence::criteria::{Criteria, Filter};
//! use danak_persistence::model::{StaticPage, StaticPageStatus};
//!
//! let stores = PersistenceConfig::default().open()?;
//! let (pages, queries) = stores.services::<StaticPage>();
//!
//! pages
//!     .create(&StaticPage {
//!         name: Some("About".to_string()),
//!         content: Some("Who we are".to_string()),
//!         status: Some(StaticPageStatus::Public),
//!         ..StaticPage::default()
//!     })
//!     .await?;
//!
//! let criteria = Criteria::new().with("status", Filter::equals("PUBLIC"));
//! let public = queries.find_by_criteria(&criteria).await?;
//! assert_eq!(public.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! Every mutation commits to the primary store before the search mirror is
//! written. A failed mirror write is logged and recorded in
//! [`service::MirrorStatus`], never rolled back into the primary store, and
//! never surfaced as an error. Structured reads always go to the primary
//! store; only free-text search reads the mirror.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
#[cfg(feature = "sqlite")]
pub mod config;
pub mod core;
pub mod criteria;
pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod model;
pub mod query;
pub mod service;

pub use error::{StorageError, StorageResult};

pub use core::{RecordStorage, SearchHits, SearchIndex};
pub use criteria::{Criteria, Filter, FilterValue, parse_criteria};
pub use query::{Page, PageRequest, SortOrder};
pub use service::{EntityService, MirrorStatus, QueryService, ReindexReport};
