//! FTS5 search mirror.
//!
//! Each record is mirrored as one row of the `search_documents` virtual
//! table: the full JSON document (unindexed) plus a `content` column holding
//! every string value of the record, which FTS5 tokenizes. Queries are
//! handed to `MATCH` verbatim, so callers use FTS5 query syntax.

use async_trait::async_trait;
use rusqlite::{TransactionBehavior, params};
use serde_json::Value;
use uuid::Uuid;

use crate::core::{SearchHits, SearchIndex};
use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::model::{Record, to_document};

use super::SqliteBackend;
use super::backend::BACKEND_NAME;
use super::schema::SEARCH_TABLE;

/// Collects every string in a document into one space-separated text.
pub(crate) fn extract_all_strings(value: &Value) -> String {
    let mut strings = Vec::new();
    extract_strings_recursive(value, &mut strings);
    strings.join(" ")
}

fn extract_strings_recursive(value: &Value, strings: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.is_empty() => strings.push(s.clone()),
        Value::Array(arr) => {
            for item in arr {
                extract_strings_recursive(item, strings);
            }
        }
        Value::Object(obj) => {
            for (key, val) in obj {
                if key != "id" {
                    extract_strings_recursive(val, strings);
                }
            }
        }
        _ => {}
    }
}

#[async_trait]
impl<R: Record> SearchIndex<R> for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite-fts5"
    }

    async fn index(&self, record: &R) -> StorageResult<()> {
        let id = record.id().ok_or_else(|| {
            StorageError::Resource(ResourceError::MissingIdentifier {
                resource_type: R::resource_type().to_string(),
            })
        })?;
        let index_name = R::schema().index_name;
        let document = Value::Object(to_document(record)?);
        let content = extract_all_strings(&document);

        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE index_name = ?1 AND record_id = ?2",
                SEARCH_TABLE
            ),
            params![index_name, id.to_string()],
        )?;
        tx.execute(
            &format!(
                "INSERT INTO {} (index_name, record_id, document, content) VALUES (?1, ?2, ?3, ?4)",
                SEARCH_TABLE
            ),
            params![index_name, id.to_string(), document.to_string(), content],
        )?;
        tx.commit()?;

        Ok(())
    }

    async fn remove(&self, id: Uuid) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE index_name = ?1 AND record_id = ?2",
                SEARCH_TABLE
            ),
            params![R::schema().index_name, id.to_string()],
        )?;
        Ok(())
    }

    async fn search(&self, query: &str) -> StorageResult<SearchHits<R>> {
        let sql = format!(
            "SELECT document FROM {table} WHERE {table} MATCH ?1 AND index_name = ?2",
            table = SEARCH_TABLE
        );

        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let raw: Vec<String> = stmt
            .query_map(params![query, R::schema().index_name], |row| row.get(0))
            .and_then(|rows| rows.collect())
            .map_err(|e| {
                StorageError::Backend(BackendError::QueryError {
                    message: format!("full-text query '{}' failed: {}", query, e),
                })
            })?;

        let documents = raw
            .iter()
            .map(|doc| serde_json::from_str(doc))
            .collect::<Result<Vec<Value>, _>>()?;

        Ok(SearchHits::new(documents))
    }

    async fn clear(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!("DELETE FROM {} WHERE index_name = ?1", SEARCH_TABLE),
            [R::schema().index_name],
        )?;
        tracing::debug!(
            backend = BACKEND_NAME,
            index = R::schema().index_name,
            "Cleared search documents"
        );
        Ok(())
    }
}
