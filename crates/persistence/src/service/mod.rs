//! Record services.
//!
//! [`EntityService`] owns mutations and keeps the search mirror in step with
//! the primary store. [`QueryService`] answers criteria reads from the primary
//! store alone.

mod entity;
mod mirror;
mod query;

pub use entity::EntityService;
pub(crate) use mirror::MirrorTracker;
pub use mirror::{MirrorOperation, MirrorStatus, ReindexReport};
pub use query::QueryService;
