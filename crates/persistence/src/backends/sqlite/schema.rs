//! SQLite schema definitions and migrations.

use rusqlite::Connection;

use crate::error::{BackendError, StorageError, StorageResult};
use crate::model::{ContactUs, EntitySchema, HelpApp, Record, StaticPage};

use super::backend::BACKEND_NAME;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the FTS5 table backing the search mirror.
pub const SEARCH_TABLE: &str = "search_documents";

/// Record tables in creation order: parents before children.
fn record_schemas() -> [&'static EntitySchema; 3] {
    [HelpApp::schema(), StaticPage::schema(), ContactUs::schema()]
}

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(internal_error(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| internal_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| internal_error(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| internal_error(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

/// Creates the record tables and the full-text mirror table.
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    for schema in record_schemas() {
        conn.execute_batch(&schema.create_table_sql()).map_err(|e| {
            internal_error(format!("Failed to create table {}: {}", schema.table, e))
        })?;

        if let Some(owner) = &schema.owner {
            conn.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column})",
                table = schema.table,
                column = owner.column
            ))
            .map_err(|e| internal_error(format!("Failed to create index: {}", e)))?;
        }
    }

    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5(
            index_name UNINDEXED,
            record_id UNINDEXED,
            document UNINDEXED,
            content,
            tokenize='porter unicode61'
        )",
        SEARCH_TABLE
    ))
    .map_err(|e| internal_error(format!("Failed to create FTS5 table: {}", e)))?;

    Ok(())
}

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
        source: None,
    })
}
