//! Remote store port consumed by the sync engine.
//!
//! One logical table per [`EntityKind`]. Each row carries `id`, the entity
//! columns, `version` (starting at 1, incremented on every successful
//! write), `updated_at`, and a nullable `deleted_at` tombstone. The remote
//! also stamps every write with a revision used as the pull cursor.

use crate::sync::domain::{PulledRecord, RemoteRecord};
use crate::workspace::domain::EntityKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Result type for remote store operations.
pub type RemoteStoreResult<T> = Result<T, RemoteStoreError>;

/// Outcome of a version-checked write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A row matched and was written; carries the new remote version.
    Applied {
        /// Version after the write.
        version: u64,
    },
    /// No row matched the identifier and expected version.
    Stale,
}

/// Network client for the authoritative remote store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Inserts the record at version 1, or replaces an existing row and
    /// advances its version by one. Returns the resulting version.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError`] when the remote is unreachable or
    /// rejects the record.
    async fn upsert(&self, record: &RemoteRecord) -> RemoteStoreResult<u64>;

    /// Replaces the row only if its version equals `expected_version`,
    /// writing `expected_version + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError`] when the remote is unreachable or
    /// rejects the record.
    async fn update_if_version(
        &self,
        record: &RemoteRecord,
        expected_version: u64,
    ) -> RemoteStoreResult<WriteOutcome>;

    /// Sets `deleted_at` only if the row's version equals
    /// `expected_version`, writing `expected_version + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError`] when the remote is unreachable.
    async fn soft_delete_if_version(
        &self,
        kind: EntityKind,
        id: Uuid,
        expected_version: u64,
        deleted_at: DateTime<Utc>,
    ) -> RemoteStoreResult<WriteOutcome>;

    /// Returns rows of `kind` written after `after_revision`, tombstones
    /// included, ordered by revision.
    ///
    /// Revisions returned are final: once a pull has returned revision `r`,
    /// no later pull may surface a row first written at or below `r`.
    /// Adapters hold back rows of writes that have not yet settled rather
    /// than return them out of order.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError`] when the remote is unreachable.
    async fn pull(
        &self,
        kind: EntityKind,
        after_revision: i64,
    ) -> RemoteStoreResult<Vec<PulledRecord>>;
}

/// Errors returned by remote store adapters.
#[derive(Debug, Clone, Error)]
pub enum RemoteStoreError {
    /// The remote could not be reached.
    #[error("remote store unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),

    /// The call exceeded its time budget.
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// The remote refused the record as malformed.
    #[error("remote rejected {kind} record: {message}")]
    Rejected {
        /// Target table.
        kind: EntityKind,
        /// Rejection detail.
        message: String,
    },
}

impl RemoteStoreError {
    /// Wraps a connectivity failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }

    /// Returns `true` for failures worth retrying on a later cycle.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}
