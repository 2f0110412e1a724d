//! Record model.
//!
//! A [`Record`] is one persisted business object. Records are plain serde
//! structs whose optional fields double as "present / absent" markers for
//! partial updates; the helpers in this module move them in and out of the
//! flat column layout described by their [`EntitySchema`].

mod contact_us;
mod help_app;
mod schema;
mod static_page;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{BackendError, StorageError, StorageResult, ValidationError};

pub use contact_us::ContactUs;
pub use help_app::HelpApp;
pub use schema::{
    EntitySchema, FieldDescriptor, FieldType, ID_FIELD, InverseRelation, OwnerRelation,
};
pub use static_page::{StaticPage, StaticPageStatus};

/// A persisted business object of one resource type.
pub trait Record:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static
{
    /// Static description of this record type.
    fn schema() -> &'static EntitySchema;

    /// The identifier, absent until the primary store assigns one.
    fn id(&self) -> Option<Uuid>;

    fn set_id(&mut self, id: Uuid);

    /// Resource type name, shorthand for `Self::schema().resource_type`.
    fn resource_type() -> &'static str {
        Self::schema().resource_type
    }
}

/// Formats a timestamp in the fixed-width form used by the primary store.
///
/// Every stored instant has nanosecond precision and a `Z` suffix, so string
/// comparison in SQL orders values chronologically. The width only holds for
/// years 0000 through 9999; see [`is_storable_timestamp`].
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Whether `ts` falls in the range the primary store can order correctly.
///
/// Outside years 0000 through 9999 the formatted year gains a sign and extra
/// digits, which breaks text ordering.
pub fn is_storable_timestamp(ts: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Serializes a record into a JSON object.
pub fn to_document<R: Record>(record: &R) -> StorageResult<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(serialization_error(format!(
            "{} serialized to a non-object value: {}",
            R::resource_type(),
            other
        ))),
    }
}

/// Flattens a record into column values, in [`EntitySchema::columns`] order.
pub fn to_columns<R: Record>(record: &R) -> StorageResult<Vec<Option<String>>> {
    let schema = R::schema();
    let document = to_document(record)?;

    let mut values = Vec::with_capacity(schema.fields.len() + 1);
    for (name, _) in schema.stored_fields() {
        let value = match document.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let is_timestamp = schema
                    .field(name)
                    .is_some_and(|f| f.field_type == FieldType::Timestamp);
                if is_timestamp {
                    let out_of_range = || {
                        StorageError::Validation(ValidationError::ConstraintViolation {
                            message: format!(
                                "{} field '{}' must fall between years 0000 and 9999",
                                schema.resource_type, name
                            ),
                        })
                    };
                    // Serde writes years past 9999 with a sign, which RFC 3339 cannot parse.
                    if s.starts_with(['+', '-']) {
                        return Err(out_of_range());
                    }
                    let ts = DateTime::parse_from_rfc3339(s)
                        .map_err(|e| {
                            serialization_error(format!("invalid timestamp in '{}': {}", name, e))
                        })?
                        .with_timezone(&Utc);
                    if !is_storable_timestamp(&ts) {
                        return Err(out_of_range());
                    }
                    Some(format_timestamp(&ts))
                } else {
                    Some(s.clone())
                }
            }
            Some(other) => {
                return Err(serialization_error(format!(
                    "field '{}' of {} is not a scalar string: {}",
                    name,
                    schema.resource_type,
                    other
                )));
            }
        };
        values.push(value);
    }

    Ok(values)
}

/// Rebuilds a record from column values in [`EntitySchema::columns`] order.
pub fn from_columns<R: Record>(values: Vec<Option<String>>) -> StorageResult<R> {
    let schema = R::schema();
    let mut document = Map::new();
    for ((name, _), value) in schema.stored_fields().into_iter().zip(values) {
        document.insert(
            name.to_string(),
            value.map(Value::String).unwrap_or(Value::Null),
        );
    }
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Returns `stored` with every field that is present on `patch` overwritten.
///
/// The identifier is never taken from the patch.
pub fn merge_present<R: Record>(stored: &R, patch: &R) -> StorageResult<R> {
    let mut merged = to_document(stored)?;
    for (name, value) in to_document(patch)? {
        if name == ID_FIELD || value.is_null() {
            continue;
        }
        merged.insert(name, value);
    }
    Ok(serde_json::from_value(Value::Object(merged))?)
}

/// Fails with [`ValidationError::MissingRequiredField`] for the first
/// required field that is absent.
pub fn check_required<R: Record>(record: &R) -> StorageResult<()> {
    let schema = R::schema();
    let document = to_document(record)?;
    for field in schema.fields.iter().filter(|f| f.required) {
        if document.get(field.name).is_none_or(Value::is_null) {
            return Err(StorageError::Validation(
                ValidationError::MissingRequiredField {
                    resource_type: schema.resource_type.to_string(),
                    field: field.name.to_string(),
                },
            ));
        }
    }
    Ok(())
}

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}
