//! Primary-store trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::model::Record;
use crate::query::{PageClause, Predicate};

/// CRUD and predicate queries against the system of record.
///
/// Every mutating method runs in its own transaction: either all of its
/// effects become visible or none do. Reads may observe a snapshot taken
/// concurrently with in-flight writes.
///
/// # Example
///
/// ```ignore
/// use danak_persistence::core::RecordStorage;
/// use danak_persistence::model::StaticPage;
///
/// async fn name_of<S: RecordStorage<StaticPage>>(storage: &S, id: uuid::Uuid) {
///     if let Some(page) = storage.read(id).await.unwrap() {
///         println!("{:?}", page.name);
///     }
/// }
/// ```
#[async_trait]
pub trait RecordStorage<R: Record>: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Inserts a new record, assigning its identifier.
    ///
    /// # Arguments
    ///
    /// * `record` - The record to insert. Its identifier is ignored.
    ///
    /// # Returns
    ///
    /// The stored record with its newly generated identifier.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - If a store constraint (such as the
    ///   owning relation's foreign key) is violated
    async fn insert(&self, record: &R) -> StorageResult<R>;

    /// Reads a record by identifier.
    ///
    /// Returns `Ok(None)` if no such record exists.
    async fn read(&self, id: Uuid) -> StorageResult<Option<R>>;

    /// Reads every record, ordered by identifier.
    async fn read_all(&self) -> StorageResult<Vec<R>>;

    /// Returns true if a record with this identifier exists.
    async fn exists(&self, id: Uuid) -> StorageResult<bool> {
        Ok(self.read(id).await?.is_some())
    }

    /// Replaces every field of an existing record.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(ResourceError::MissingIdentifier)` - If the
    ///   record carries no identifier
    /// * `StorageError::Resource(ResourceError::NotFound)` - If no record with
    ///   the identifier exists
    async fn replace(&self, record: &R) -> StorageResult<R>;

    /// Overwrites the fields that are present on `patch`, leaving the others
    /// at their stored value. Reading, merging and writing happen in a
    /// single transaction.
    ///
    /// Returns `Ok(None)` if no record with the identifier exists.
    async fn merge(&self, id: Uuid, patch: &R) -> StorageResult<Option<R>>;

    /// Deletes a record.
    ///
    /// Returns `Ok(false)` if nothing was deleted. Deleting an unknown
    /// identifier is not an error.
    async fn delete(&self, id: Uuid) -> StorageResult<bool>;

    /// Returns the records matching a compiled predicate.
    ///
    /// With a page clause, ordering, limit and offset apply after filtering.
    /// Without one, every matching row is returned in identifier order. Rows
    /// duplicated by a member join are only collapsed if the predicate is
    /// distinct.
    async fn find(&self, predicate: &Predicate, page: Option<&PageClause>) -> StorageResult<Vec<R>>;

    /// Counts the rows [`RecordStorage::find`] would return without a page
    /// clause, without materializing them.
    async fn count(&self, predicate: &Predicate) -> StorageResult<u64>;
}
