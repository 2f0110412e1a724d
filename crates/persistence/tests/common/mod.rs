//! Test infrastructure for the persistence layer.
//!
//! Fixtures for the three record types, service builders over in-memory
//! SQLite, and a search index that fails on demand.

#![allow(dead_code)]

pub mod failing_index;
pub mod fixtures;

pub use failing_index::*;
pub use fixtures::*;
