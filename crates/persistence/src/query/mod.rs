//! Specification compiler and query building blocks.
//!
//! [`compile`] turns a [`crate::criteria::Criteria`] into an opaque
//! [`Predicate`]; [`compile_page`] validates a [`PageRequest`] against the
//! same schema. Both are pure and run before any store is contacted.

mod compiler;
mod pagination;
mod sql;

pub use compiler::{PageClause, Predicate, compile, compile_page};
pub use pagination::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest, SortDirection, SortOrder,
};
pub use sql::{SqlFragment, SqlParam};
