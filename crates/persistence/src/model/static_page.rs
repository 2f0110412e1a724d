//! Static pages shown inside a help application.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntitySchema, FieldDescriptor, FieldType, OwnerRelation, Record};

/// Publication state of a [`StaticPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaticPageStatus {
    Draft,
    Public,
}

impl StaticPageStatus {
    pub const VARIANTS: &'static [&'static str] = &["DRAFT", "PUBLIC"];
}

/// A page of HTML content, optionally owned by a [`super::HelpApp`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticPage {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub status: Option<StaticPageStatus>,
    pub file_id: Option<Uuid>,
    /// Owning help application, flattened to its id.
    pub help_app_id: Option<Uuid>,
}

static FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("id", "id", FieldType::Uuid),
    FieldDescriptor::new("name", "name", FieldType::String).required(),
    FieldDescriptor::new("content", "content", FieldType::Text)
        .required()
        .unfilterable(),
    FieldDescriptor::new("status", "status", FieldType::Enum(StaticPageStatus::VARIANTS)),
    FieldDescriptor::new("fileId", "file_id", FieldType::Uuid),
];

static SCHEMA: EntitySchema = EntitySchema {
    resource_type: "StaticPage",
    table: "static_page",
    index_name: "staticpage",
    fields: FIELDS,
    owner: Some(OwnerRelation {
        field: "helpAppId",
        column: "help_app_id",
        target_table: "help_app",
    }),
    inverse: None,
};

impl Record for StaticPage {
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
