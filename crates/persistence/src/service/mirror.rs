//! Search-mirror bookkeeping.
//!
//! The search index is written after the primary store has committed and is
//! never rolled back into it. When an index write fails the record's
//! document stays stale until the record is mutated again or the mirror is
//! rebuilt with [`super::EntityService::reindex`]. [`MirrorStatus`] makes that
//! staleness observable.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::SyncError;

/// Kind of write sent to the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorOperation {
    Index,
    Remove,
    Clear,
    Refresh,
}

impl fmt::Display for MirrorOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MirrorOperation::Index => "index",
            MirrorOperation::Remove => "remove",
            MirrorOperation::Clear => "clear",
            MirrorOperation::Refresh => "refresh",
        })
    }
}

/// Snapshot of a service's search-mirror health.
#[derive(Debug, Clone, Default)]
pub struct MirrorStatus {
    /// Time of the last successful index write.
    pub last_success: Option<DateTime<Utc>>,

    /// Time of the last failed index write.
    pub last_failure: Option<DateTime<Utc>>,

    /// The last failure, if any.
    pub last_error: Option<SyncError>,

    /// Total successful index writes.
    pub total_synced: u64,

    /// Total failed index writes.
    pub total_errors: u64,
}

impl MirrorStatus {
    /// Returns true unless the most recent index write failed.
    pub fn is_healthy(&self) -> bool {
        match (self.last_success, self.last_failure) {
            (_, None) => true,
            (Some(ok), Some(failed)) => ok > failed,
            (None, Some(_)) => false,
        }
    }
}

/// Shared, thread-safe mirror status.
#[derive(Debug, Clone, Default)]
pub(crate) struct MirrorTracker {
    status: Arc<RwLock<MirrorStatus>>,
}

impl MirrorTracker {
    pub(crate) fn record_success(&self) {
        let mut status = self.status.write();
        status.last_success = Some(Utc::now());
        status.total_synced += 1;
    }

    pub(crate) fn record_failure(&self, error: SyncError) {
        let mut status = self.status.write();
        status.last_failure = Some(Utc::now());
        status.last_error = Some(error);
        status.total_errors += 1;
    }

    pub(crate) fn snapshot(&self) -> MirrorStatus {
        self.status.read().clone()
    }
}

/// Outcome of rebuilding a record type's search index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    /// Records written to the index.
    pub indexed: u64,
    /// Records whose index write failed.
    pub failed: u64,
}

impl ReindexReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}
