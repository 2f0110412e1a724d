//! Record fixtures and store builders.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use danak_persistence::backends::sqlite::SqliteBackend;
use danak_persistence::core::SearchIndex;
use danak_persistence::model::{ContactUs, HelpApp, Record, StaticPage, StaticPageStatus};
use danak_persistence::service::{EntityService, QueryService};

/// Creates an in-memory SQLite backend with the schema in place.
pub fn create_backend() -> Arc<SqliteBackend> {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    Arc::new(backend)
}

/// Services over separate primary and index databases.
pub struct Harness<R: Record> {
    pub primary: Arc<SqliteBackend>,
    pub index: Arc<SqliteBackend>,
    pub entities: EntityService<R>,
    pub queries: QueryService<R>,
}

impl<R: Record> Harness<R> {
    pub fn new() -> Self {
        let primary = create_backend();
        let index = create_backend();
        let entities = EntityService::new(primary.clone(), index.clone());
        let queries = QueryService::new(primary.clone());
        Self {
            primary,
            index,
            entities,
            queries,
        }
    }

    /// Services whose index writes go through `index` instead.
    pub fn with_index(index: Arc<dyn SearchIndex<R>>) -> (EntityService<R>, QueryService<R>) {
        let primary = create_backend();
        (
            EntityService::new(primary.clone(), index),
            QueryService::new(primary),
        )
    }
}

pub fn static_page(name: &str) -> StaticPage {
    StaticPage {
        name: Some(name.to_string()),
        content: Some(format!("<h1>{}</h1>", name)),
        status: Some(StaticPageStatus::Draft),
        ..StaticPage::default()
    }
}

pub fn page_of(name: &str, help_app: Uuid) -> StaticPage {
    StaticPage {
        help_app_id: Some(help_app),
        ..static_page(name)
    }
}

pub fn help_app() -> HelpApp {
    HelpApp::default()
}

pub fn contact(email: &str) -> ContactUs {
    ContactUs {
        email: Some(email.to_string()),
        message: Some(format!("Message from {}", email)),
        ..ContactUs::default()
    }
}

pub fn contact_at(email: &str, time: DateTime<Utc>) -> ContactUs {
    ContactUs {
        create_time: Some(time),
        ..contact(email)
    }
}

/// A fixed instant plus `nanos` nanoseconds.
pub fn instant(nanos: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::nanoseconds(nanos)
}
