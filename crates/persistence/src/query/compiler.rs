//! Criteria compiler.
//!
//! Lowers a [`Criteria`] to a [`Predicate`]: a set of SQL joins and
//! conditions over the record's table, checked against the record's
//! [`EntitySchema`]. Compilation is pure. It never touches a store, and every
//! operator/type mismatch is reported here rather than at execution time.
//!
//! Lowering rules (column `c`):
//!
//! | Filter | SQL |
//! |--------|-----|
//! | `Equals(v)` | `c = ?` |
//! | `NotEquals(v)` | `c <> ?` (absent values never match) |
//! | `In([])` | `1 = 0` |
//! | `In(vs)` | `c IN (?, ...)` |
//! | `NotIn([])` | `c IS NOT NULL` |
//! | `NotIn(vs)` | `c NOT IN (?, ...)` (absent values never match) |
//! | `Specified(b)` | `c IS NOT NULL` / `c IS NULL` |
//! | ranges | `c > ?`, `c >= ?`, `c < ?`, `c <= ?` on fixed-width UTC text |
//! | `Contains(s)` | `instr(c, ?) > 0` (byte-wise, case-sensitive) |
//! | `NotContains(s)` | `instr(c, ?) = 0` (absent values never match) |
//!
//! Owner filters LEFT JOIN the parent table as `owner` and constrain
//! `owner.id`. Member filters LEFT JOIN the child table as `member` and
//! constrain `member.id`; one parent row is produced per matching child
//! unless the criteria ask for `distinct`.

use crate::criteria::{Criteria, Filter, FilterValue};
use crate::error::CriteriaError;
use crate::model::{EntitySchema, FieldType, ID_FIELD, is_storable_timestamp};

use super::pagination::{PageRequest, SortDirection};
use super::sql::{SqlFragment, SqlParam};

const BASE_ALIAS: &str = "t";
const OWNER_ALIAS: &str = "owner";
const MEMBER_ALIAS: &str = "member";

/// A compiled, store-native condition over one record table.
///
/// Only produced by [`compile`]. An unconstrained criteria compiles to the
/// universal predicate, which carries no conditions at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    resource_type: &'static str,
    table: &'static str,
    joins: Vec<String>,
    conditions: Vec<String>,
    params: Vec<SqlParam>,
    distinct: bool,
}

/// Ordering and window of a paged query, validated against a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PageClause {
    order_by: Vec<(&'static str, SortDirection)>,
    limit: u32,
    offset: u64,
}

/// Compiles criteria against a record schema.
///
/// # Errors
///
/// Returns [`CriteriaError`] if a filter names an unknown or non-filterable
/// field, a relation the schema does not have, an operator the field's type
/// does not support, or a value of the wrong type.
pub fn compile(schema: &EntitySchema, criteria: &Criteria) -> Result<Predicate, CriteriaError> {
    let mut bound = SqlFragment::default();
    let mut joins = Vec::new();
    let mut conditions = Vec::new();

    for (name, filter) in criteria.fields() {
        let field = schema.field(name).ok_or_else(|| CriteriaError::UnknownField {
            resource_type: schema.resource_type.to_string(),
            field: name.to_string(),
        })?;
        if !field.filterable {
            return Err(CriteriaError::FieldNotFilterable {
                resource_type: schema.resource_type.to_string(),
                field: name.to_string(),
            });
        }
        check_filter(name, field.field_type, filter)?;
        let column = format!("{}.{}", BASE_ALIAS, field.column);
        conditions.push(lower(&column, filter, &mut bound));
    }

    if let Some(filter) = criteria.owner_id() {
        let owner = schema.owner.ok_or_else(|| CriteriaError::NoSuchRelation {
            resource_type: schema.resource_type.to_string(),
            relation: "owning".to_string(),
        })?;
        check_filter(owner.field, FieldType::Uuid, filter)?;
        joins.push(format!(
            "LEFT JOIN {} AS {} ON {}.id = {}.{}",
            owner.target_table, OWNER_ALIAS, OWNER_ALIAS, BASE_ALIAS, owner.column
        ));
        conditions.push(lower(&format!("{}.id", OWNER_ALIAS), filter, &mut bound));
    }

    if let Some(filter) = criteria.member_id() {
        let inverse = schema.inverse.ok_or_else(|| CriteriaError::NoSuchRelation {
            resource_type: schema.resource_type.to_string(),
            relation: "inverse".to_string(),
        })?;
        check_filter(inverse.filter_name, FieldType::Uuid, filter)?;
        joins.push(format!(
            "LEFT JOIN {} AS {} ON {}.{} = {}.id",
            inverse.child_table, MEMBER_ALIAS, MEMBER_ALIAS, inverse.child_column, BASE_ALIAS
        ));
        conditions.push(lower(&format!("{}.id", MEMBER_ALIAS), filter, &mut bound));
    }

    Ok(Predicate {
        resource_type: schema.resource_type,
        table: schema.table,
        joins,
        conditions,
        params: bound.params,
        distinct: criteria.is_distinct(),
    })
}

/// Validates a page request's sort fields and fixes its window.
///
/// The identifier is appended as a final ascending tie-breaker unless the
/// request already orders by it, so paging is stable.
pub fn compile_page(
    schema: &EntitySchema,
    request: &PageRequest,
) -> Result<PageClause, CriteriaError> {
    let mut order_by = Vec::with_capacity(request.sort.len() + 1);
    for order in &request.sort {
        let field = schema
            .field(&order.field)
            .filter(|_| schema.is_sortable(&order.field))
            .ok_or_else(|| CriteriaError::UnknownSortField {
                resource_type: schema.resource_type.to_string(),
                field: order.field.clone(),
            })?;
        order_by.push((field.column, order.direction));
    }
    if !order_by.iter().any(|(column, _)| *column == ID_FIELD) {
        order_by.push((ID_FIELD, SortDirection::Ascending));
    }

    Ok(PageClause {
        order_by,
        limit: request.size,
        offset: request.offset(),
    })
}

fn check_filter(field: &str, field_type: FieldType, filter: &Filter) -> Result<(), CriteriaError> {
    let operator = filter.operator();
    if !field_type.supports(operator) {
        return Err(CriteriaError::UnsupportedOperator {
            field: field.to_string(),
            operator: operator.to_string(),
            field_type: field_type.to_string(),
        });
    }

    let expected = match field_type {
        FieldType::Uuid => "uuid",
        FieldType::Timestamp => "timestamp",
        FieldType::String | FieldType::Text | FieldType::Enum(_) => "string",
    };
    for value in filter.values() {
        if value.kind() != expected {
            return Err(CriteriaError::ValueTypeMismatch {
                field: field.to_string(),
                expected: expected.to_string(),
                actual: value.kind().to_string(),
            });
        }
        if let (FieldType::Enum(variants), FilterValue::String(s)) = (field_type, value)
            && !variants.contains(&s.as_str())
        {
            return Err(CriteriaError::UnknownEnumVariant {
                field: field.to_string(),
                value: s.clone(),
                allowed: variants.join(", "),
            });
        }
        if let FilterValue::Timestamp(ts) = value
            && !is_storable_timestamp(ts)
        {
            return Err(CriteriaError::InvalidValue {
                field: field.to_string(),
                value: ts.to_rfc3339(),
                message: "timestamps must fall between years 0000 and 9999".to_string(),
            });
        }
    }
    Ok(())
}

fn lower(column: &str, filter: &Filter, bound: &mut SqlFragment) -> String {
    let mut bind = |value: &FilterValue| bound.add_param(SqlParam::String(value.to_column_text()));

    match filter {
        Filter::Equals(v) => format!("{} = {}", column, bind(v)),
        Filter::NotEquals(v) => format!("{} <> {}", column, bind(v)),
        Filter::In(values) if values.is_empty() => "1 = 0".to_string(),
        Filter::In(values) => {
            let placeholders: Vec<String> = values.iter().map(&mut bind).collect();
            format!("{} IN ({})", column, placeholders.join(", "))
        }
        Filter::NotIn(values) if values.is_empty() => format!("{} IS NOT NULL", column),
        Filter::NotIn(values) => {
            let placeholders: Vec<String> = values.iter().map(&mut bind).collect();
            format!("{} NOT IN ({})", column, placeholders.join(", "))
        }
        Filter::Specified(true) => format!("{} IS NOT NULL", column),
        Filter::Specified(false) => format!("{} IS NULL", column),
        Filter::GreaterThan(v) => format!("{} > {}", column, bind(v)),
        Filter::GreaterOrEqual(v) => format!("{} >= {}", column, bind(v)),
        Filter::LessThan(v) => format!("{} < {}", column, bind(v)),
        Filter::LessOrEqual(v) => format!("{} <= {}", column, bind(v)),
        Filter::Contains(needle) => {
            let placeholder = bind(&FilterValue::String(needle.clone()));
            format!("instr({}, {}) > 0", column, placeholder)
        }
        Filter::NotContains(needle) => {
            let placeholder = bind(&FilterValue::String(needle.clone()));
            format!("instr({}, {}) = 0", column, placeholder)
        }
    }
}

impl Predicate {
    /// Resource type this predicate was compiled for.
    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    /// Whether result rows should be de-duplicated.
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Returns true if the predicate matches every record.
    pub fn is_universal(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of conjoined conditions.
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    fn from_where(&self, sql: &mut String) {
        sql.push_str(&format!(" FROM {} AS {}", self.table, BASE_ALIAS));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
    }

    /// Builds the SELECT for the given columns of the base table.
    ///
    /// Without a page clause rows are ordered by identifier.
    pub fn select_sql(&self, columns: &[&str], page: Option<&PageClause>) -> SqlFragment {
        let projection: Vec<String> = columns
            .iter()
            .map(|c| format!("{}.{}", BASE_ALIAS, c))
            .collect();
        let mut sql = format!(
            "SELECT {}{}",
            if self.distinct { "DISTINCT " } else { "" },
            projection.join(", ")
        );
        self.from_where(&mut sql);

        let mut fragment = SqlFragment {
            sql,
            params: self.params.clone(),
        };

        match page {
            Some(page) => {
                let order: Vec<String> = page
                    .order_by
                    .iter()
                    .map(|(column, dir)| format!("{}.{} {}", BASE_ALIAS, column, dir.as_sql()))
                    .collect();
                fragment.push_sql(&format!(" ORDER BY {}", order.join(", ")));
                let limit = fragment.add_param(SqlParam::integer(i64::from(page.limit)));
                let offset = fragment.add_param(SqlParam::integer(
                    i64::try_from(page.offset).unwrap_or(i64::MAX),
                ));
                fragment.push_sql(&format!(" LIMIT {} OFFSET {}", limit, offset));
            }
            None => fragment.push_sql(&format!(" ORDER BY {}.{} ASC", BASE_ALIAS, ID_FIELD)),
        }

        fragment
    }

    /// Builds a COUNT over the same rows [`Predicate::select_sql`] returns.
    pub fn count_sql(&self) -> SqlFragment {
        let mut sql = if self.distinct {
            format!("SELECT COUNT(DISTINCT {}.{})", BASE_ALIAS, ID_FIELD)
        } else {
            "SELECT COUNT(*)".to_string()
        };
        self.from_where(&mut sql);
        SqlFragment {
            sql,
            params: self.params.clone(),
        }
    }
}

impl PageClause {
    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContactUs, HelpApp, Record, StaticPage};
    use crate::query::pagination::SortOrder;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn columns() -> Vec<&'static str> {
        StaticPage::schema().columns()
    }

    #[test]
    fn test_empty_criteria_is_universal() {
        let predicate = compile(StaticPage::schema(), &Criteria::new()).unwrap();
        assert!(predicate.is_universal());
        let sql = predicate.select_sql(&columns(), None);
        assert!(!sql.sql.contains("WHERE"));
        assert!(!sql.sql.contains("JOIN"));
        assert!(sql.params.is_empty());
    }

    #[test]
    fn test_field_filters_are_conjoined() {
        let criteria = Criteria::new()
            .with("name", Filter::contains("Help"))
            .with("status", Filter::equals("PUBLIC"));
        let predicate = compile(StaticPage::schema(), &criteria).unwrap();
        let sql = predicate.select_sql(&columns(), None);

        assert!(sql.sql.contains("instr(t.name, ?1) > 0 AND t.status = ?2"));
        assert_eq!(
            sql.params,
            vec![SqlParam::string("Help"), SqlParam::string("PUBLIC")]
        );
    }

    #[test]
    fn test_empty_sets() {
        let schema = StaticPage::schema();
        let none = compile(schema, &Criteria::new().with("status", Filter::In(vec![]))).unwrap();
        assert!(none.count_sql().sql.ends_with("WHERE 1 = 0"));

        let present =
            compile(schema, &Criteria::new().with("status", Filter::NotIn(vec![]))).unwrap();
        assert!(present.count_sql().sql.ends_with("WHERE t.status IS NOT NULL"));
    }

    #[test]
    fn test_in_set_binds_each_value() {
        let criteria = Criteria::new().with("status", Filter::in_set(["DRAFT", "PUBLIC"]));
        let predicate = compile(StaticPage::schema(), &criteria).unwrap();
        let sql = predicate.count_sql();
        assert!(sql.sql.contains("t.status IN (?1, ?2)"));
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn test_timestamp_range_uses_fixed_width_text() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let criteria = Criteria::new().with("createTime", Filter::greater_or_equal(t));
        let predicate = compile(ContactUs::schema(), &criteria).unwrap();
        let sql = predicate.count_sql();
        assert!(sql.sql.contains("t.create_time >= ?1"));
        assert_eq!(
            sql.params,
            vec![SqlParam::string("2024-03-01T08:00:00.000000000Z")]
        );
    }

    #[test]
    fn test_owner_filter_left_joins_parent() {
        let id = Uuid::new_v4();
        let criteria = Criteria::new().with_owner_id(Filter::equals(id));
        let predicate = compile(StaticPage::schema(), &criteria).unwrap();
        let sql = predicate.select_sql(&columns(), None);
        assert!(
            sql.sql
                .contains("LEFT JOIN help_app AS owner ON owner.id = t.help_app_id")
        );
        assert!(sql.sql.contains("WHERE owner.id = ?1"));
    }

    #[test]
    fn test_member_filter_and_distinct() {
        let criteria = Criteria::new()
            .with_member_id(Filter::specified(true))
            .with_distinct(true);
        let predicate = compile(HelpApp::schema(), &criteria).unwrap();
        let select = predicate.select_sql(&HelpApp::schema().columns(), None);
        assert!(select.sql.starts_with("SELECT DISTINCT t.id, t.static_page_id"));
        assert!(
            select
                .sql
                .contains("LEFT JOIN static_page AS member ON member.help_app_id = t.id")
        );
        assert!(
            predicate
                .count_sql()
                .sql
                .starts_with("SELECT COUNT(DISTINCT t.id)")
        );
    }

    #[test]
    fn test_compile_errors() {
        let schema = StaticPage::schema();
        let compile_one = |field: &str, filter: Filter| {
            compile(schema, &Criteria::new().with(field, filter)).unwrap_err()
        };

        assert!(matches!(
            compile_one("title", Filter::equals("x")),
            CriteriaError::UnknownField { .. }
        ));
        assert!(matches!(
            compile_one("content", Filter::contains("x")),
            CriteriaError::FieldNotFilterable { .. }
        ));
        assert!(matches!(
            compile_one("status", Filter::greater_than("DRAFT")),
            CriteriaError::UnsupportedOperator { .. }
        ));
        assert!(matches!(
            compile_one("fileId", Filter::contains("abc")),
            CriteriaError::UnsupportedOperator { .. }
        ));
        assert!(matches!(
            compile_one("fileId", Filter::equals("abc")),
            CriteriaError::ValueTypeMismatch { .. }
        ));
        assert!(matches!(
            compile_one("status", Filter::equals("ARCHIVED")),
            CriteriaError::UnknownEnumVariant { .. }
        ));

        let err = compile(
            ContactUs::schema(),
            &Criteria::new().with_owner_id(Filter::specified(true)),
        )
        .unwrap_err();
        assert!(matches!(err, CriteriaError::NoSuchRelation { .. }));

        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let err = compile(
            ContactUs::schema(),
            &Criteria::new().with("createTime", Filter::greater_than(far)),
        )
        .unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidValue { ref field, .. } if field == "createTime"));
    }

    #[test]
    fn test_paged_select_appends_window_params() {
        let criteria = Criteria::new().with("name", Filter::not_equals("x"));
        let predicate = compile(StaticPage::schema(), &criteria).unwrap();
        let page = compile_page(
            StaticPage::schema(),
            &PageRequest::new(2, 10).with_sort(SortOrder::desc("name")),
        )
        .unwrap();

        let sql = predicate.select_sql(&columns(), Some(&page));
        assert!(
            sql.sql
                .ends_with("ORDER BY t.name DESC, t.id ASC LIMIT ?2 OFFSET ?3")
        );
        assert_eq!(sql.params[1], SqlParam::integer(10));
        assert_eq!(sql.params[2], SqlParam::integer(20));
    }

    #[test]
    fn test_sort_validation() {
        let schema = StaticPage::schema();
        let err = compile_page(schema, &PageRequest::default().with_sort(SortOrder::asc("content")))
            .unwrap_err();
        assert!(matches!(err, CriteriaError::UnknownSortField { .. }));

        let by_id = compile_page(schema, &PageRequest::default().with_sort(SortOrder::desc("id")))
            .unwrap();
        assert_eq!(by_id.order_by, vec![("id", SortDirection::Descending)]);
    }
}
