//! Query service: criteria reads against the primary store.

use std::sync::Arc;

use tracing::debug;

use crate::core::RecordStorage;
use crate::criteria::Criteria;
use crate::error::StorageResult;
use crate::model::Record;
use crate::query::{Page, PageRequest, compile, compile_page};

/// Read-only criteria queries for one record type.
///
/// Every call compiles the criteria once and runs the result against the
/// primary store. The search index is never consulted, so results reflect
/// committed writes only.
pub struct QueryService<R: Record> {
    storage: Arc<dyn RecordStorage<R>>,
}

impl<R: Record> Clone for QueryService<R> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<R: Record> QueryService<R> {
    pub fn new(storage: Arc<dyn RecordStorage<R>>) -> Self {
        Self { storage }
    }

    /// Returns every record matching `criteria`, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns `CriteriaError` if the criteria do not compile against the
    /// record type's schema. Nothing is sent to the store in that case.
    pub async fn find_by_criteria(&self, criteria: &Criteria) -> StorageResult<Vec<R>> {
        debug!(resource_type = R::resource_type(), ?criteria, "Find by criteria");
        let predicate = compile(R::schema(), criteria)?;
        self.storage.find(&predicate, None).await
    }

    /// Returns one page of the records matching `criteria`.
    ///
    /// The page's total is counted with the same predicate, so it equals the
    /// length of [`QueryService::find_by_criteria`] for the same criteria.
    pub async fn find_page_by_criteria(
        &self,
        criteria: &Criteria,
        request: &PageRequest,
    ) -> StorageResult<Page<R>> {
        debug!(
            resource_type = R::resource_type(),
            ?criteria,
            page = request.page,
            size = request.size,
            "Find page by criteria"
        );
        let predicate = compile(R::schema(), criteria)?;
        let clause = compile_page(R::schema(), request)?;

        let content = self.storage.find(&predicate, Some(&clause)).await?;
        let total = self.storage.count(&predicate).await?;
        Ok(Page::new(content, request, total))
    }

    /// Counts the records matching `criteria` without loading them.
    pub async fn count_by_criteria(&self, criteria: &Criteria) -> StorageResult<u64> {
        debug!(resource_type = R::resource_type(), ?criteria, "Count by criteria");
        let predicate = compile(R::schema(), criteria)?;
        self.storage.count(&predicate).await
    }
}
