//! Query-string parsing for criteria.
//!
//! Accepts `<field>.<operator>=<value>` pairs, the bare `distinct=<bool>`
//! flag, and relation filters addressed by their synthetic `...Id` name.
//! Values are typed according to the field's declared semantic type.
//! The paging keys `page`, `size` and `sort` are skipped here and handled by
//! [`crate::query::PageRequest::from_query`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CriteriaError;
use crate::model::{EntitySchema, FieldType};

use super::{Criteria, Filter, FilterOperator, FilterValue};

const PAGING_KEYS: &[&str] = &["page", "size", "sort"];

enum Target {
    Field(FieldType),
    Owner,
    Member,
}

/// Parses a URL query string into criteria for the given schema.
///
/// # Errors
///
/// Returns [`CriteriaError`] if a key is malformed, names an unknown field or
/// operator, repeats a field, or carries a value that cannot be typed.
pub fn parse_criteria(schema: &EntitySchema, query: &str) -> Result<Criteria, CriteriaError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut criteria = Criteria::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if PAGING_KEYS.contains(&key.as_ref()) {
            continue;
        }
        if key == "distinct" {
            criteria.set_distinct(parse_bool(&key, &value)?);
            continue;
        }

        let Some((name, op)) = key.rsplit_once('.') else {
            return Err(CriteriaError::MalformedParameter {
                parameter: key.to_string(),
                message: "expected <field>.<operator>".to_string(),
            });
        };
        let operator: FilterOperator =
            op.parse()
                .map_err(|message| CriteriaError::MalformedParameter {
                    parameter: key.to_string(),
                    message,
                })?;

        let target = resolve(schema, name)?;
        let value_type = match target {
            Target::Field(field_type) => field_type,
            Target::Owner | Target::Member => FieldType::Uuid,
        };
        let filter = build_filter(name, operator, &value, value_type)?;

        let replaced = match target {
            Target::Field(_) => criteria.set(name, filter).is_some(),
            Target::Owner => {
                let replaced = criteria.owner_id().is_some();
                criteria.set_owner_id(Some(filter));
                replaced
            }
            Target::Member => {
                let replaced = criteria.member_id().is_some();
                criteria.set_member_id(Some(filter));
                replaced
            }
        };
        if replaced {
            return Err(CriteriaError::DuplicateFilter {
                field: name.to_string(),
            });
        }
    }

    Ok(criteria)
}

fn resolve(schema: &EntitySchema, name: &str) -> Result<Target, CriteriaError> {
    if let Some(field) = schema.field(name) {
        if !field.filterable {
            return Err(CriteriaError::FieldNotFilterable {
                resource_type: schema.resource_type.to_string(),
                field: name.to_string(),
            });
        }
        return Ok(Target::Field(field.field_type));
    }
    if schema.owner.is_some_and(|owner| owner.field == name) {
        return Ok(Target::Owner);
    }
    if schema.inverse.is_some_and(|inverse| inverse.filter_name == name) {
        return Ok(Target::Member);
    }
    Err(CriteriaError::UnknownField {
        resource_type: schema.resource_type.to_string(),
        field: name.to_string(),
    })
}

fn build_filter(
    field: &str,
    operator: FilterOperator,
    raw: &str,
    field_type: FieldType,
) -> Result<Filter, CriteriaError> {
    let filter = match operator {
        FilterOperator::Specified => Filter::Specified(parse_bool(field, raw)?),
        FilterOperator::Contains => Filter::Contains(raw.to_string()),
        FilterOperator::NotContains => Filter::NotContains(raw.to_string()),
        FilterOperator::In | FilterOperator::NotIn => {
            let values = raw
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| parse_value(field, s, field_type))
                .collect::<Result<Vec<_>, _>>()?;
            if operator == FilterOperator::In {
                Filter::In(values)
            } else {
                Filter::NotIn(values)
            }
        }
        FilterOperator::Equals => Filter::Equals(parse_value(field, raw, field_type)?),
        FilterOperator::NotEquals => Filter::NotEquals(parse_value(field, raw, field_type)?),
        FilterOperator::GreaterThan => Filter::GreaterThan(parse_value(field, raw, field_type)?),
        FilterOperator::GreaterOrEqual => {
            Filter::GreaterOrEqual(parse_value(field, raw, field_type)?)
        }
        FilterOperator::LessThan => Filter::LessThan(parse_value(field, raw, field_type)?),
        FilterOperator::LessOrEqual => Filter::LessOrEqual(parse_value(field, raw, field_type)?),
    };
    Ok(filter)
}

fn parse_value(field: &str, raw: &str, field_type: FieldType) -> Result<FilterValue, CriteriaError> {
    let invalid = |message: String| CriteriaError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        message,
    };
    match field_type {
        FieldType::Uuid => Uuid::parse_str(raw)
            .map(FilterValue::Uuid)
            .map_err(|e| invalid(e.to_string())),
        FieldType::Timestamp => DateTime::parse_from_rfc3339(raw)
            .map(|ts| FilterValue::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|e| invalid(e.to_string())),
        FieldType::String | FieldType::Text | FieldType::Enum(_) => {
            Ok(FilterValue::String(raw.to_string()))
        }
    }
}

fn parse_bool(field: &str, raw: &str) -> Result<bool, CriteriaError> {
    raw.parse().map_err(|_| CriteriaError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        message: "expected true or false".to_string(),
    })
}
