//! SearchIndex implementation for Elasticsearch.

use async_trait::async_trait;
use elasticsearch::{DeleteByQueryParts, DeleteParts, IndexParts, SearchParts};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::{SearchHits, SearchIndex};
use crate::error::{ResourceError, StorageError, StorageResult};
use crate::model::{Record, to_document};

use super::ElasticsearchBackend;
use super::backend::{BACKEND_NAME, internal_error};

/// Builds the body of a free-text search.
///
/// The query text goes to a `query_string` query unchanged, so callers use
/// Lucene query syntax.
pub(crate) fn search_body(query: &str, size: u32) -> Value {
    json!({
        "size": size,
        "query": {
            "query_string": {
                "query": query
            }
        }
    })
}

/// Extracts `_source` documents from a search response.
pub(crate) fn parse_hits(body: &Value) -> Vec<Value> {
    body.get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(|h| h.as_array())
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.get("_source").cloned())
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl<R: Record> SearchIndex<R> for ElasticsearchBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn index(&self, record: &R) -> StorageResult<()> {
        let id = record.id().ok_or_else(|| {
            StorageError::Resource(ResourceError::MissingIdentifier {
                resource_type: R::resource_type().to_string(),
            })
        })?;
        let index = self.index_name(R::schema().index_name);
        let doc_id = id.to_string();
        let document = Value::Object(to_document(record)?);

        let response = self
            .client()
            .index(IndexParts::IndexId(&index, &doc_id))
            .body(document)
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to index document: {}", e)))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(internal_error(format!(
                "Failed to index document (status {}): {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn remove(&self, id: Uuid) -> StorageResult<()> {
        let index = self.index_name(R::schema().index_name);
        let doc_id = id.to_string();

        let response = self
            .client()
            .delete(DeleteParts::IndexId(&index, &doc_id))
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to delete document: {}", e)))?;

        let status = response.status_code();
        // 404 means the document (or the whole index) is already gone
        if !status.is_success() && status.as_u16() != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(internal_error(format!(
                "Failed to delete document (status {}): {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn search(&self, query: &str) -> StorageResult<SearchHits<R>> {
        let index = self.index_name(R::schema().index_name);

        let response = self
            .client()
            .search(SearchParts::Index(&[&index]))
            .body(search_body(query, self.config().max_result_window))
            .send()
            .await
            .map_err(|e| internal_error(format!("Search request failed: {}", e)))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("index_not_found_exception") {
                return Ok(SearchHits::empty());
            }
            return Err(internal_error(format!(
                "Search failed (status {}): {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        Ok(SearchHits::new(parse_hits(&body)))
    }

    async fn clear(&self) -> StorageResult<()> {
        let index = self.index_name(R::schema().index_name);

        let response = self
            .client()
            .delete_by_query(DeleteByQueryParts::Index(&[&index]))
            .body(json!({ "query": { "match_all": {} } }))
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to clear index {}: {}", index, e)))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if !body.contains("index_not_found_exception") {
                return Err(internal_error(format!(
                    "Failed to clear index {} (status {}): {}",
                    index, status, body
                )));
            }
        }

        tracing::debug!(index = %index, "Cleared Elasticsearch index");
        Ok(())
    }

    async fn refresh(&self) -> StorageResult<()> {
        self.refresh_index(R::schema().index_name).await
    }
}
