//! Backend implementations.
//!
//! | Backend | Feature | Role |
//! |---------|---------|------|
//! | SQLite | `sqlite` | Primary store, and an FTS5 search mirror |
//! | Elasticsearch | `elasticsearch` | Search mirror |

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
