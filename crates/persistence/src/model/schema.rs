//! Field and relation descriptors.
//!
//! Every record type publishes a static [`EntitySchema`]. The criteria
//! compiler consults it to decide which operators a field accepts and which
//! column and join a filter lowers to; the SQLite backend uses it to derive
//! DDL and column lists.

use std::fmt;

use crate::criteria::FilterOperator;

/// Semantic type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Opaque identifier, stored in hyphenated form.
    Uuid,
    /// Short string, supports substring matching.
    String,
    /// Long free text. Stored and mirrored, never filtered.
    Text,
    /// One of a fixed set of variants.
    Enum(&'static [&'static str]),
    /// Instant in UTC, compared with full precision.
    Timestamp,
}

impl FieldType {
    /// Returns true if values of this type have a total order usable by
    /// range operators.
    pub fn is_ordered(&self) -> bool {
        matches!(self, FieldType::Timestamp)
    }

    /// Returns true if substring operators apply.
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldType::String)
    }

    /// Returns true if the operator may be applied to a field of this type.
    pub fn supports(&self, operator: FilterOperator) -> bool {
        if matches!(self, FieldType::Text) {
            return false;
        }
        if operator.is_range() {
            return self.is_ordered();
        }
        if operator.is_substring() {
            return self.is_textual();
        }
        true
    }

    /// Short lowercase name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Uuid => "uuid",
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Enum(_) => "enum",
            FieldType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes one scalar field of a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Field name as it appears in criteria, documents and JSON.
    pub name: &'static str,
    /// Column in the primary store.
    pub column: &'static str,
    pub field_type: FieldType,
    /// Whether criteria may constrain this field.
    pub filterable: bool,
    /// Whether the field must be present on create and update.
    pub required: bool,
}

impl FieldDescriptor {
    /// An optional, filterable field.
    pub const fn new(name: &'static str, column: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            column,
            field_type,
            filterable: true,
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn unfilterable(mut self) -> Self {
        self.filterable = false;
        self
    }
}

/// A record's reference to at most one parent record.
#[derive(Debug, Clone, Copy)]
pub struct OwnerRelation {
    /// Field on the record that carries the parent id (e.g. `helpAppId`).
    /// Also the synthetic criteria name used to filter on the parent id.
    pub field: &'static str,
    /// Foreign-key column on the record's own table.
    pub column: &'static str,
    /// Table holding the parent records.
    pub target_table: &'static str,
}

/// A parent's view of the child records that reference it.
#[derive(Debug, Clone, Copy)]
pub struct InverseRelation {
    /// Synthetic criteria name addressing a child's id (e.g. `staticPageIdId`).
    pub filter_name: &'static str,
    /// Table holding the child records.
    pub child_table: &'static str,
    /// Foreign-key column on the child table pointing back at the parent.
    pub child_column: &'static str,
}

/// Static description of one record type.
#[derive(Debug)]
pub struct EntitySchema {
    /// Resource type name used in logs and errors.
    pub resource_type: &'static str,
    /// Primary-store table.
    pub table: &'static str,
    /// Search index (or FTS partition) name.
    pub index_name: &'static str,
    /// Scalar fields, including `id` first.
    pub fields: &'static [FieldDescriptor],
    pub owner: Option<OwnerRelation>,
    pub inverse: Option<InverseRelation>,
}

/// Name of the identifier field shared by every record type.
pub const ID_FIELD: &str = "id";

impl EntitySchema {
    /// Looks up a scalar field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the column names in storage order: scalar fields, then the
    /// owner foreign key.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = self.fields.iter().map(|f| f.column).collect();
        if let Some(owner) = &self.owner {
            columns.push(owner.column);
        }
        columns
    }

    /// Returns `(field name, column)` pairs for every stored value, including
    /// the owner foreign key.
    pub fn stored_fields(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs: Vec<_> = self.fields.iter().map(|f| (f.name, f.column)).collect();
        if let Some(owner) = &self.owner {
            pairs.push((owner.field, owner.column));
        }
        pairs
    }

    /// Returns true if `name` is a column that may appear in ORDER BY.
    pub fn is_sortable(&self, name: &str) -> bool {
        self.field(name)
            .is_some_and(|f| !matches!(f.field_type, FieldType::Text))
    }

    /// Generates the CREATE TABLE statement for this record type.
    pub fn create_table_sql(&self) -> String {
        let mut columns = Vec::with_capacity(self.fields.len() + 1);
        for field in self.fields {
            let mut column = format!("{} TEXT", field.column);
            if field.name == ID_FIELD {
                column.push_str(" PRIMARY KEY NOT NULL");
            } else if field.required {
                column.push_str(" NOT NULL");
            }
            if let FieldType::Enum(variants) = field.field_type {
                let allowed: Vec<String> = variants.iter().map(|v| format!("'{}'", v)).collect();
                column.push_str(&format!(
                    " CHECK ({} IN ({}))",
                    field.column,
                    allowed.join(", ")
                ));
            }
            columns.push(column);
        }
        if let Some(owner) = &self.owner {
            columns.push(format!(
                "{} TEXT REFERENCES {}(id)",
                owner.column, owner.target_table
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.table,
            columns.join(",\n    ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::new("id", "id", FieldType::Uuid),
        FieldDescriptor::new("title", "title", FieldType::String).required(),
        FieldDescriptor::new("body", "body", FieldType::Text).unfilterable(),
        FieldDescriptor::new("state", "state", FieldType::Enum(&["OPEN", "CLOSED"])),
    ];

    static TEST_SCHEMA: EntitySchema = EntitySchema {
        resource_type: "Ticket",
        table: "ticket",
        index_name: "ticket",
        fields: TEST_FIELDS,
        owner: Some(OwnerRelation {
            field: "queueId",
            column: "queue_id",
            target_table: "queue",
        }),
        inverse: None,
    };

    #[test]
    fn test_operator_capabilities() {
        assert!(FieldType::Timestamp.supports(FilterOperator::GreaterThan));
        assert!(!FieldType::Uuid.supports(FilterOperator::LessThan));
        assert!(FieldType::String.supports(FilterOperator::Contains));
        assert!(!FieldType::Enum(&["A"]).supports(FilterOperator::Contains));
        assert!(!FieldType::Text.supports(FilterOperator::Equals));
        assert!(FieldType::Uuid.supports(FilterOperator::Specified));
    }

    #[test]
    fn test_columns_include_owner() {
        assert_eq!(
            TEST_SCHEMA.columns(),
            vec!["id", "title", "body", "state", "queue_id"]
        );
        assert_eq!(TEST_SCHEMA.stored_fields().last(), Some(&("queueId", "queue_id")));
    }

    #[test]
    fn test_create_table_sql() {
        let sql = TEST_SCHEMA.create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS ticket"));
        assert!(sql.contains("id TEXT PRIMARY KEY NOT NULL"));
        assert!(sql.contains("title TEXT NOT NULL"));
        assert!(sql.contains("CHECK (state IN ('OPEN', 'CLOSED'))"));
        assert!(sql.contains("queue_id TEXT REFERENCES queue(id)"));
    }

    #[test]
    fn test_sortable_fields() {
        assert!(TEST_SCHEMA.is_sortable("title"));
        assert!(!TEST_SCHEMA.is_sortable("body"));
        assert!(!TEST_SCHEMA.is_sortable("missing"));
    }
}
