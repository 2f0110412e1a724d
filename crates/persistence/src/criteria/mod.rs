//! Criteria: the structured filter request for one resource type.
//!
//! A [`Criteria`] holds at most one [`Filter`] per field, optional filters on
//! the owning parent's id and on inverse-relation members' ids, and the
//! `distinct` flag. It is a plain data holder. Nothing is validated until it
//! is compiled against a schema by [`crate::query::compile`].
//!
//! # Example
//!
//! ```
//! use danak_persistence::criteria::{Criteria, Filter};
//!
//! let base = Criteria::new().with("status", Filter::equals("PUBLIC"));
//! let narrowed = base.clone().with("name", Filter::contains("Help"));
//!
//! assert_eq!(base.len(), 1);
//! assert_eq!(narrowed.len(), 2);
//! ```

mod filter;
mod parser;

use std::collections::BTreeMap;

pub use filter::{Filter, FilterOperator, FilterValue};
pub use parser::parse_criteria;

/// Per-field filters plus relation filters and the `distinct` flag.
///
/// `Clone` is a deep copy: every contained filter is owned, so changing a
/// copy never affects the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    fields: BTreeMap<String, Filter>,
    owner_id: Option<Filter>,
    member_id: Option<Filter>,
    distinct: bool,
}

impl Criteria {
    /// Creates criteria with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter for a field, replacing any previous one.
    pub fn with(mut self, field: impl Into<String>, filter: Filter) -> Self {
        self.fields.insert(field.into(), filter);
        self
    }

    /// Sets the filter for a field and returns the one it replaced.
    pub fn set(&mut self, field: impl Into<String>, filter: Filter) -> Option<Filter> {
        self.fields.insert(field.into(), filter)
    }

    /// Removes the filter for a field.
    pub fn remove(&mut self, field: &str) -> Option<Filter> {
        self.fields.remove(field)
    }

    /// Returns the filter for a field, if any.
    pub fn filter(&self, field: &str) -> Option<&Filter> {
        self.fields.get(field)
    }

    /// Iterates over field filters in field-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of field filters, not counting relation filters.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Constrains the owning parent's identifier.
    pub fn with_owner_id(mut self, filter: Filter) -> Self {
        self.owner_id = Some(filter);
        self
    }

    pub fn set_owner_id(&mut self, filter: Option<Filter>) {
        self.owner_id = filter;
    }

    pub fn owner_id(&self) -> Option<&Filter> {
        self.owner_id.as_ref()
    }

    /// Constrains the identifier of inverse-relation members (children).
    pub fn with_member_id(mut self, filter: Filter) -> Self {
        self.member_id = Some(filter);
        self
    }

    pub fn set_member_id(&mut self, filter: Option<Filter>) {
        self.member_id = filter;
    }

    pub fn member_id(&self) -> Option<&Filter> {
        self.member_id.as_ref()
    }

    /// Requests de-duplication of result rows.
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Returns true if no field or relation is constrained.
    pub fn is_unconstrained(&self) -> bool {
        self.fields.is_empty() && self.owner_id.is_none() && self.member_id.is_none()
    }
}
