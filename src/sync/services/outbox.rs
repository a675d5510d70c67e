//! Handle used by workspace services to commit changes with their sync work.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::sync::{
    domain::NewSyncOperation,
    ports::{JournalResult, JournaledStore, OperationQueue, QueueError, QueueResult},
};
use crate::workspace::domain::ChangeSet;

/// Enqueue side of the operation queue.
///
/// When online sync is disabled the outbox records no operations, so local
/// mutations behave identically either way.
#[derive(Debug)]
pub struct Outbox<Q>
where
    Q: OperationQueue,
{
    queue: Option<Arc<Q>>,
}

impl<Q> Clone for Outbox<Q>
where
    Q: OperationQueue,
{
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<Q> Outbox<Q>
where
    Q: OperationQueue,
{
    /// Creates an outbox that appends to `queue`.
    #[must_use]
    pub const fn new(queue: Arc<Q>) -> Self {
        Self { queue: Some(queue) }
    }

    /// Creates an outbox that records nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { queue: None }
    }

    /// Creates an enabled or disabled outbox from the online-sync flag.
    #[must_use]
    pub fn from_flag(queue: Arc<Q>, online_sync: bool) -> Self {
        if online_sync {
            Self::new(queue)
        } else {
            Self::disabled()
        }
    }

    /// Returns whether operations are being recorded.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.queue.is_some()
    }

    /// Writes the change set to `store` together with one queued operation
    /// per record, in order.
    ///
    /// A disabled outbox writes the records alone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::sync::ports::JournalError`] when a payload cannot be
    /// encoded or either side rejects the write; nothing is written or queued
    /// in that case.
    pub fn commit<S>(
        &self,
        store: &S,
        changes: &ChangeSet,
        enqueued_at: DateTime<Utc>,
    ) -> JournalResult<()>
    where
        S: JournaledStore<Q>,
    {
        let Some(queue) = &self.queue else {
            store.commit(changes)?;
            return Ok(());
        };
        let operations = changes
            .entities()
            .iter()
            .map(|entity| {
                NewSyncOperation::capture(entity, enqueued_at)
                    .map_err(|err| QueueError::Encode(err.to_string()))
            })
            .collect::<QueueResult<Vec<_>>>()?;
        let count = operations.len();
        store.commit_journaled(queue.as_ref(), changes, operations)?;
        debug!(operations = count, "committed change set with sync operations");
        Ok(())
    }
}
