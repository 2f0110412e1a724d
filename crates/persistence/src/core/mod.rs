//! Core storage traits.
//!
//! - [`RecordStorage`] - The primary store: CRUD plus compiled-predicate
//!   queries. It is the system of record.
//! - [`SearchIndex`] - The search mirror: whole-document upserts, deletes
//!   and free-text queries. It may lag behind the primary store.
//!
//! Both traits are generic over the [`crate::model::Record`] type so one
//! backend value can serve every resource.

pub mod search;
pub mod storage;

pub use search::{SearchHits, SearchIndex};
pub use storage::RecordStorage;
