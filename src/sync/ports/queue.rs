//! Durable operation queue port.

use crate::sync::domain::{NewSyncOperation, OperationId, SyncOperation};
use crate::workspace::domain::EntityKind;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Ordered, append-only queue of pending sync operations.
///
/// Appends must be atomic so mutation calls and the drain loop can share the
/// queue without further coordination.
pub trait OperationQueue: Send + Sync {
    /// Appends an operation and returns its queue identifier.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Persistence`] when storage fails.
    fn enqueue(&self, operation: NewSyncOperation) -> QueueResult<OperationId>;

    /// Appends every operation in order, or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Persistence`] when storage fails; nothing is
    /// appended in that case.
    fn enqueue_all(&self, operations: Vec<NewSyncOperation>) -> QueueResult<Vec<OperationId>>;

    /// Returns every queued operation in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Persistence`] when storage fails.
    fn pending(&self) -> QueueResult<Vec<SyncOperation>>;

    /// Removes an operation. Removing an unknown identifier is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Persistence`] when storage fails.
    fn remove(&self, id: OperationId) -> QueueResult<()>;

    /// Moves queued operations for one entity from `from_version` onto
    /// `to_version`, returning how many were updated.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Persistence`] when storage fails.
    fn rebase(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        from_version: u64,
        to_version: u64,
    ) -> QueueResult<usize>;

    /// Returns the identifiers of entities with queued operations.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Persistence`] when storage fails.
    fn pending_entity_ids(&self) -> QueueResult<BTreeSet<Uuid>> {
        Ok(self
            .pending()?
            .iter()
            .map(SyncOperation::entity_id)
            .collect())
    }
}

/// Errors returned by queue implementations.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// A stored operation could not be decoded.
    #[error("corrupt sync operation {id}: {message}")]
    Corrupt {
        /// Queue identifier.
        id: OperationId,
        /// Decoder message.
        message: String,
    },

    /// An operation could not be captured from its entity.
    #[error("cannot encode sync payload: {0}")]
    Encode(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl QueueError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
