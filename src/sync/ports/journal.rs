//! Local writes that carry the operations replicating them.

use thiserror::Error;

use super::{OperationQueue, QueueError};
use crate::sync::domain::NewSyncOperation;
use crate::workspace::{
    domain::ChangeSet,
    ports::{LocalStore, LocalStoreError},
};

/// Result type for journaled commits.
pub type JournalResult<T> = Result<T, JournalError>;

/// A local store that writes records together with their sync operations.
///
/// Readers of the store and the queue observe either all of a commit or
/// none of it: a change set is never visible locally without its queued
/// operations, and operations are never queued for records that were not
/// written.
pub trait JournaledStore<Q>: LocalStore
where
    Q: OperationQueue,
{
    /// Writes `changes` and appends `operations` to `queue` as one unit.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] when either side fails; nothing is written
    /// or queued in that case.
    fn commit_journaled(
        &self,
        queue: &Q,
        changes: &ChangeSet,
        operations: Vec<NewSyncOperation>,
    ) -> JournalResult<()>;
}

/// Failure of a journaled commit.
#[derive(Debug, Clone, Error)]
pub enum JournalError {
    /// The store rejected the records.
    #[error(transparent)]
    Store(#[from] LocalStoreError),

    /// The queue rejected the operations.
    #[error(transparent)]
    Queue(#[from] QueueError),
}
