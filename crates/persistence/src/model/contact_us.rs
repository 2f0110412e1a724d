//! Contact requests submitted by users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntitySchema, FieldDescriptor, FieldType, Record};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUs {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
}

static FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("id", "id", FieldType::Uuid),
    FieldDescriptor::new("userId", "user_id", FieldType::Uuid),
    FieldDescriptor::new("email", "email", FieldType::String).required(),
    FieldDescriptor::new("message", "message", FieldType::Text).unfilterable(),
    FieldDescriptor::new("createTime", "create_time", FieldType::Timestamp),
];

static SCHEMA: EntitySchema = EntitySchema {
    resource_type: "ContactUs",
    table: "contact_us",
    index_name: "contactus",
    fields: FIELDS,
    owner: None,
    inverse: None,
};

impl Record for ContactUs {
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
