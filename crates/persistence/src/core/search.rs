//! Search mirror trait.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::model::Record;

/// A secondary, free-text searchable copy of records.
///
/// The index holds one document per identifier. Writes replace the whole
/// document, so a reader never sees a partially written record, only a
/// possibly stale one.
#[async_trait]
pub trait SearchIndex<R: Record>: Send + Sync {
    /// Returns a human-readable name for this index backend.
    fn backend_name(&self) -> &'static str;

    /// Upserts the document for a record.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(ResourceError::MissingIdentifier)` - If the
    ///   record has no identifier
    async fn index(&self, record: &R) -> StorageResult<()>;

    /// Removes the document for an identifier. Removing a missing document
    /// succeeds.
    async fn remove(&self, id: Uuid) -> StorageResult<()>;

    /// Runs a free-text query in the index's native syntax.
    ///
    /// The query string is passed through verbatim. Results are unordered.
    /// Every call queries the current index state.
    async fn search(&self, query: &str) -> StorageResult<SearchHits<R>>;

    /// Removes every document of this record type.
    async fn clear(&self) -> StorageResult<()>;

    /// Makes every write so far visible to [`SearchIndex::search`].
    ///
    /// Indexes that are searchable as soon as a write returns keep the
    /// default no-op.
    async fn refresh(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Documents returned by a search, decoded into records as they are
/// iterated.
#[derive(Debug)]
pub struct SearchHits<R> {
    documents: std::vec::IntoIter<Value>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> SearchHits<R> {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents: documents.into_iter(),
            _record: PhantomData,
        }
    }

    /// Returns an empty result.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of documents not yet yielded.
    pub fn remaining(&self) -> usize {
        self.documents.len()
    }

    /// Decodes every remaining document.
    pub fn collect_records(self) -> StorageResult<Vec<R>> {
        self.collect()
    }
}

impl<R: Record> Iterator for SearchHits<R> {
    type Item = StorageResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.documents
            .next()
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.documents.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HelpApp;
    use serde_json::json;

    #[test]
    fn test_search_hits_decode_lazily() {
        let id = Uuid::new_v4();
        let mut hits: SearchHits<HelpApp> = SearchHits::new(vec![
            json!({ "id": id.to_string(), "staticPageId": null }),
            json!({ "id": 42 }),
        ]);

        assert_eq!(hits.remaining(), 2);
        let first = hits.next().unwrap().unwrap();
        assert_eq!(first.id, Some(id));
        assert!(hits.next().unwrap().is_err());
        assert!(hits.next().is_none());
    }
}
