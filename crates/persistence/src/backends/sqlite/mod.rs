//! SQLite backend implementation.
//!
//! [`SqliteBackend`] implements both [`crate::core::RecordStorage`] (one
//! table per record type, columns mirroring the record's fields) and
//! [`crate::core::SearchIndex`] (an FTS5 virtual table). It supports
//! in-memory databases for tests and file-based databases for deployments.
//!
//! # Example
//!
//! ```no_run
//! use danak_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let records = SqliteBackend::open("./data/records.db")?;
//! records.init_schema()?;
//!
//! let index = SqliteBackend::open("./data/search.db")?;
//! index.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE help_app (
//!     id TEXT PRIMARY KEY NOT NULL,
//!     static_page_id TEXT
//! );
//!
//! CREATE TABLE static_page (
//!     id TEXT PRIMARY KEY NOT NULL,
//!     name TEXT NOT NULL,
//!     content TEXT NOT NULL,
//!     status TEXT CHECK (status IN ('DRAFT', 'PUBLIC')),
//!     file_id TEXT,
//!     help_app_id TEXT REFERENCES help_app(id)
//! );
//!
//! CREATE TABLE contact_us (
//!     id TEXT PRIMARY KEY NOT NULL,
//!     user_id TEXT,
//!     email TEXT NOT NULL,
//!     message TEXT,
//!     create_time TEXT  -- fixed-width UTC, nanosecond precision
//! );
//!
//! CREATE VIRTUAL TABLE search_documents USING fts5(
//!     index_name UNINDEXED,
//!     record_id UNINDEXED,
//!     document UNINDEXED,
//!     content,
//!     tokenize='porter unicode61'
//! );
//! ```

mod backend;
mod fts;
mod schema;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
