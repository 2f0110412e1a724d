//! A search index wrapper that fails on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use danak_persistence::core::{SearchHits, SearchIndex};
use danak_persistence::error::{BackendError, StorageError, StorageResult};
use danak_persistence::model::Record;

/// Delegates to an inner index unless switched to failing.
pub struct FailingIndex<R: Record> {
    inner: Arc<dyn SearchIndex<R>>,
    failing: AtomicBool,
    rejected: AtomicUsize,
    refreshed: AtomicUsize,
}

impl<R: Record> FailingIndex<R> {
    pub fn new(inner: Arc<dyn SearchIndex<R>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: AtomicBool::new(false),
            rejected: AtomicUsize::new(0),
            refreshed: AtomicUsize::new(0),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of writes refused so far.
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Number of refreshes requested so far.
    pub fn refreshed(&self) -> usize {
        self.refreshed.load(Ordering::SeqCst)
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Backend(BackendError::Unavailable {
                backend_name: "failing".to_string(),
                message: "index switched off".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Record> SearchIndex<R> for FailingIndex<R> {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn index(&self, record: &R) -> StorageResult<()> {
        self.check()?;
        self.inner.index(record).await
    }

    async fn remove(&self, id: Uuid) -> StorageResult<()> {
        self.check()?;
        self.inner.remove(id).await
    }

    async fn search(&self, query: &str) -> StorageResult<SearchHits<R>> {
        self.inner.search(query).await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.check()?;
        self.inner.clear().await
    }

    async fn refresh(&self) -> StorageResult<()> {
        self.refreshed.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.refresh().await
    }
}
