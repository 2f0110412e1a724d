//! Entity service: mutations with dual writes.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::{RecordStorage, SearchHits, SearchIndex};
use crate::error::{ResourceError, StorageError, StorageResult, SyncError};
use crate::model::{Record, check_required};

use super::mirror::{MirrorOperation, MirrorStatus, MirrorTracker, ReindexReport};

/// Creates, updates and deletes records of one type, keeping the search
/// mirror in step.
///
/// # Ordering and failure
///
/// Every mutation commits to the primary store first. Only then is the
/// index written: a whole-document upsert after create and update, a delete
/// after delete. An index failure is logged and recorded in
/// [`EntityService::mirror_status`] and the call still succeeds. Nothing is
/// retried or rolled back.
pub struct EntityService<R: Record> {
    storage: Arc<dyn RecordStorage<R>>,
    index: Arc<dyn SearchIndex<R>>,
    mirror: MirrorTracker,
}

impl<R: Record> Clone for EntityService<R> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            index: Arc::clone(&self.index),
            mirror: self.mirror.clone(),
        }
    }
}

impl<R: Record> EntityService<R> {
    pub fn new(storage: Arc<dyn RecordStorage<R>>, index: Arc<dyn SearchIndex<R>>) -> Self {
        Self::with_tracker(storage, index, MirrorTracker::default())
    }

    /// Builds a service that reports into an existing mirror status.
    pub(crate) fn with_tracker(
        storage: Arc<dyn RecordStorage<R>>,
        index: Arc<dyn SearchIndex<R>>,
        mirror: MirrorTracker,
    ) -> Self {
        Self {
            storage,
            index,
            mirror,
        }
    }

    /// Stores a new record and mirrors it.
    ///
    /// # Errors
    ///
    /// * `ResourceError::IdentifierAlreadyAssigned` - If the record already
    ///   carries an identifier
    /// * `ValidationError::MissingRequiredField` - If a required field is absent
    pub async fn create(&self, record: &R) -> StorageResult<R> {
        debug!(resource_type = R::resource_type(), "Request to save record");
        if let Some(id) = record.id() {
            return Err(StorageError::Resource(
                ResourceError::IdentifierAlreadyAssigned {
                    resource_type: R::resource_type().to_string(),
                    id: id.to_string(),
                },
            ));
        }
        check_required(record)?;

        let stored = self.storage.insert(record).await?;
        self.mirror_index(&stored).await;
        Ok(stored)
    }

    /// Replaces every field of an existing record and re-mirrors it.
    ///
    /// # Errors
    ///
    /// * `ResourceError::MissingIdentifier` - If the record has no identifier
    /// * `ResourceError::NotFound` - If no record with the identifier exists
    /// * `ValidationError::MissingRequiredField` - If a required field is absent
    pub async fn update(&self, record: &R) -> StorageResult<R> {
        let id = self.require_id(record)?;
        debug!(resource_type = R::resource_type(), %id, "Request to update record");
        check_required(record)?;

        let stored = self.storage.replace(record).await?;
        self.mirror_index(&stored).await;
        Ok(stored)
    }

    /// Overwrites only the fields present on `record`.
    ///
    /// Returns `Ok(None)` if no record with the identifier exists, in which
    /// case the index is not touched.
    pub async fn partial_update(&self, record: &R) -> StorageResult<Option<R>> {
        let id = self.require_id(record)?;
        debug!(resource_type = R::resource_type(), %id, "Request to partially update record");

        let Some(merged) = self.storage.merge(id, record).await? else {
            return Ok(None);
        };
        self.mirror_index(&merged).await;
        Ok(Some(merged))
    }

    /// Deletes a record from the primary store and then from the index.
    ///
    /// Deleting an unknown identifier succeeds.
    pub async fn delete(&self, id: Uuid) -> StorageResult<()> {
        let existed = self.storage.delete(id).await?;
        debug!(resource_type = R::resource_type(), %id, existed, "Request to delete record");

        match self.index.remove(id).await {
            Ok(()) => self.mirror.record_success(),
            Err(e) => self.record_failure(MirrorOperation::Remove, &id.to_string(), &e),
        }
        Ok(())
    }

    /// Reads one record from the primary store.
    pub async fn find_one(&self, id: Uuid) -> StorageResult<Option<R>> {
        debug!(resource_type = R::resource_type(), %id, "Request to get record");
        self.storage.read(id).await
    }

    /// Reads every record from the primary store.
    pub async fn find_all(&self) -> StorageResult<Vec<R>> {
        debug!(resource_type = R::resource_type(), "Request to get all records");
        self.storage.read_all().await
    }

    pub async fn exists(&self, id: Uuid) -> StorageResult<bool> {
        self.storage.exists(id).await
    }

    /// Runs a free-text query against the search mirror only.
    ///
    /// Results may lag behind the primary store.
    pub async fn search(&self, query: &str) -> StorageResult<SearchHits<R>> {
        debug!(resource_type = R::resource_type(), query, "Request to search records");
        self.index.search(query).await
    }

    /// Rebuilds this record type's index from the primary store.
    ///
    /// Clears the index, writes one document per stored record, then
    /// refreshes the index so the rebuilt documents are searchable.
    /// Individual write failures and a failed refresh are counted in the
    /// mirror status; a failure to clear or to read the primary store is
    /// returned.
    pub async fn reindex(&self) -> StorageResult<ReindexReport> {
        info!(resource_type = R::resource_type(), "Rebuilding search index");

        if let Err(e) = self.index.clear().await {
            self.record_failure(MirrorOperation::Clear, "*", &e);
            return Err(e);
        }

        let mut report = ReindexReport::default();
        for record in self.storage.read_all().await? {
            if self.mirror_index(&record).await {
                report.indexed += 1;
            } else {
                report.failed += 1;
            }
        }

        // Documents already written stay in place and show up on the index's
        // own refresh, so the rebuild still reports what it wrote.
        if let Err(e) = self.index.refresh().await {
            self.record_failure(MirrorOperation::Refresh, "*", &e);
        }

        info!(
            resource_type = R::resource_type(),
            indexed = report.indexed,
            failed = report.failed,
            "Search index rebuilt"
        );
        Ok(report)
    }

    /// Returns the health of this service's search mirror.
    pub fn mirror_status(&self) -> MirrorStatus {
        self.mirror.snapshot()
    }

    fn require_id(&self, record: &R) -> StorageResult<Uuid> {
        record.id().ok_or_else(|| {
            StorageError::Resource(ResourceError::MissingIdentifier {
                resource_type: R::resource_type().to_string(),
            })
        })
    }

    /// Writes a stored record to the index. Returns false if the write failed.
    async fn mirror_index(&self, record: &R) -> bool {
        let id = record.id().map(|id| id.to_string()).unwrap_or_default();
        match self.index.index(record).await {
            Ok(()) => {
                self.mirror.record_success();
                true
            }
            Err(e) => {
                self.record_failure(MirrorOperation::Index, &id, &e);
                false
            }
        }
    }

    fn record_failure(&self, operation: MirrorOperation, id: &str, error: &StorageError) {
        warn!(
            resource_type = R::resource_type(),
            id,
            %operation,
            error = %error,
            "Search index write failed, index is stale for this record"
        );
        self.mirror.record_failure(SyncError::IndexSyncFailure {
            resource_type: R::resource_type().to_string(),
            id: id.to_string(),
            operation: operation.to_string(),
            message: error.to_string(),
        });
    }
}
