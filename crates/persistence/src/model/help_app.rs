//! Help applications, the parents of static pages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntitySchema, FieldDescriptor, FieldType, InverseRelation, Record};

/// A help application. Pages reference it through their `helpAppId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpApp {
    pub id: Option<Uuid>,
    /// Landing page of the application. A plain reference, not a relation.
    pub static_page_id: Option<Uuid>,
}

static FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("id", "id", FieldType::Uuid),
    FieldDescriptor::new("staticPageId", "static_page_id", FieldType::Uuid),
];

static SCHEMA: EntitySchema = EntitySchema {
    resource_type: "HelpApp",
    table: "help_app",
    index_name: "helpapp",
    fields: FIELDS,
    owner: None,
    inverse: Some(InverseRelation {
        filter_name: "staticPageIdId",
        child_table: "static_page",
        child_column: "help_app_id",
    }),
};

impl Record for HelpApp {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }
}
