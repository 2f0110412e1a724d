//! Single-field filter primitives.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::format_timestamp;

/// A typed operand of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Uuid(Uuid),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    /// Kind name used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            FilterValue::Uuid(_) => "uuid",
            FilterValue::String(_) => "string",
            FilterValue::Timestamp(_) => "timestamp",
        }
    }

    /// Renders the value the way the primary store holds it.
    pub fn to_column_text(&self) -> String {
        match self {
            FilterValue::Uuid(id) => id.hyphenated().to_string(),
            FilterValue::String(s) => s.clone(),
            FilterValue::Timestamp(ts) => format_timestamp(ts),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_column_text())
    }
}

impl From<Uuid> for FilterValue {
    fn from(id: Uuid) -> Self {
        FilterValue::Uuid(id)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::String(s)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(ts)
    }
}

/// A condition on one field.
///
/// Filters are inert values: they are only interpreted when a
/// [`super::Criteria`] is compiled against a record schema, which is also
/// where operator and value types are checked.
///
/// An empty `In` set matches nothing. An empty `NotIn` set matches every
/// record whose field is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equals(FilterValue),
    NotEquals(FilterValue),
    In(Vec<FilterValue>),
    NotIn(Vec<FilterValue>),
    /// `true` requires the field to be present, `false` requires it absent.
    Specified(bool),
    GreaterThan(FilterValue),
    GreaterOrEqual(FilterValue),
    LessThan(FilterValue),
    LessOrEqual(FilterValue),
    /// Case-sensitive substring match.
    Contains(String),
    NotContains(String),
}

impl Filter {
    pub fn equals(value: impl Into<FilterValue>) -> Self {
        Filter::Equals(value.into())
    }

    pub fn not_equals(value: impl Into<FilterValue>) -> Self {
        Filter::NotEquals(value.into())
    }

    pub fn in_set<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        Filter::In(values.into_iter().map(Into::into).collect())
    }

    pub fn not_in_set<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        Filter::NotIn(values.into_iter().map(Into::into).collect())
    }

    pub fn specified(present: bool) -> Self {
        Filter::Specified(present)
    }

    pub fn greater_than(value: impl Into<FilterValue>) -> Self {
        Filter::GreaterThan(value.into())
    }

    pub fn greater_or_equal(value: impl Into<FilterValue>) -> Self {
        Filter::GreaterOrEqual(value.into())
    }

    pub fn less_than(value: impl Into<FilterValue>) -> Self {
        Filter::LessThan(value.into())
    }

    pub fn less_or_equal(value: impl Into<FilterValue>) -> Self {
        Filter::LessOrEqual(value.into())
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Filter::Contains(needle.into())
    }

    pub fn not_contains(needle: impl Into<String>) -> Self {
        Filter::NotContains(needle.into())
    }

    /// The operator this filter applies.
    pub fn operator(&self) -> FilterOperator {
        match self {
            Filter::Equals(_) => FilterOperator::Equals,
            Filter::NotEquals(_) => FilterOperator::NotEquals,
            Filter::In(_) => FilterOperator::In,
            Filter::NotIn(_) => FilterOperator::NotIn,
            Filter::Specified(_) => FilterOperator::Specified,
            Filter::GreaterThan(_) => FilterOperator::GreaterThan,
            Filter::GreaterOrEqual(_) => FilterOperator::GreaterOrEqual,
            Filter::LessThan(_) => FilterOperator::LessThan,
            Filter::LessOrEqual(_) => FilterOperator::LessOrEqual,
            Filter::Contains(_) => FilterOperator::Contains,
            Filter::NotContains(_) => FilterOperator::NotContains,
        }
    }

    /// The typed operands carried by this filter.
    ///
    /// Substring and presence filters have none.
    pub fn values(&self) -> Vec<&FilterValue> {
        match self {
            Filter::Equals(v)
            | Filter::NotEquals(v)
            | Filter::GreaterThan(v)
            | Filter::GreaterOrEqual(v)
            | Filter::LessThan(v)
            | Filter::LessOrEqual(v) => vec![v],
            Filter::In(vs) | Filter::NotIn(vs) => vs.iter().collect(),
            Filter::Specified(_) | Filter::Contains(_) | Filter::NotContains(_) => Vec::new(),
        }
    }
}

/// Filter operators, named as they appear in query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Specified,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    NotContains,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "notEquals",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "notIn",
            FilterOperator::Specified => "specified",
            FilterOperator::GreaterThan => "greaterThan",
            FilterOperator::GreaterOrEqual => "greaterThanOrEqual",
            FilterOperator::LessThan => "lessThan",
            FilterOperator::LessOrEqual => "lessThanOrEqual",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "doesNotContain",
        }
    }

    /// Returns true for the four ordering comparisons.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            FilterOperator::GreaterThan
                | FilterOperator::GreaterOrEqual
                | FilterOperator::LessThan
                | FilterOperator::LessOrEqual
        )
    }

    /// Returns true for substring operators.
    pub fn is_substring(&self) -> bool {
        matches!(self, FilterOperator::Contains | FilterOperator::NotContains)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(FilterOperator::Equals),
            "notEquals" => Ok(FilterOperator::NotEquals),
            "in" => Ok(FilterOperator::In),
            "notIn" => Ok(FilterOperator::NotIn),
            "specified" => Ok(FilterOperator::Specified),
            "greaterThan" => Ok(FilterOperator::GreaterThan),
            "greaterThanOrEqual" => Ok(FilterOperator::GreaterOrEqual),
            "lessThan" => Ok(FilterOperator::LessThan),
            "lessThanOrEqual" => Ok(FilterOperator::LessOrEqual),
            "contains" => Ok(FilterOperator::Contains),
            "doesNotContain" => Ok(FilterOperator::NotContains),
            _ => Err(format!("unknown filter operator: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trips_through_name() {
        for op in [
            FilterOperator::Equals,
            FilterOperator::NotIn,
            FilterOperator::GreaterOrEqual,
            FilterOperator::NotContains,
        ] {
            assert_eq!(op.as_str().parse::<FilterOperator>().unwrap(), op);
        }
        assert!("startsWith".parse::<FilterOperator>().is_err());
    }

    #[test]
    fn test_filter_values() {
        let id = Uuid::new_v4();
        assert_eq!(Filter::equals(id).values(), vec![&FilterValue::Uuid(id)]);
        assert_eq!(Filter::in_set(["a", "b"]).values().len(), 2);
        assert!(Filter::contains("x").values().is_empty());
        assert_eq!(Filter::specified(false).operator(), FilterOperator::Specified);
    }

    #[test]
    fn test_uuid_column_text_is_hyphenated() {
        let id = Uuid::nil();
        assert_eq!(
            FilterValue::from(id).to_column_text(),
            "00000000-0000-0000-0000-000000000000"
        );
    }
}
