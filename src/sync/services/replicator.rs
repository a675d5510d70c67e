//! Folds inbound remote records into the local store.

use std::sync::Arc;

use tracing::warn;

use crate::sync::domain::RemoteRecord;
use crate::workspace::{
    domain::ChangeSet,
    ports::{LocalStore, LocalStoreResult},
};

/// What happened to one inbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The record replaced or created the local copy.
    Applied,
    /// The local copy is newer; nothing was written.
    Ignored,
    /// The record could not be decoded; nothing was written.
    Undecodable,
}

/// Last-writer-wins application of whole records by version.
#[derive(Debug)]
pub struct Replicator<S>
where
    S: LocalStore,
{
    store: Arc<S>,
}

impl<S> Clone for Replicator<S>
where
    S: LocalStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> Replicator<S>
where
    S: LocalStore,
{
    /// Creates a replicator writing into `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Overwrites the local copy when the inbound version is at least the
    /// local version. Tombstoned records are stored, not erased, so later
    /// listings skip them.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn apply(&self, record: RemoteRecord) -> LocalStoreResult<ApplyOutcome> {
        let kind = record.kind();
        let entity = match record.into_entity() {
            Ok(entity) => entity,
            Err(err) => {
                warn!(%kind, error = %err, "skipping undecodable remote record");
                return Ok(ApplyOutcome::Undecodable);
            }
        };

        let incoming = entity.meta().version();
        let local = self.store.entity(kind, entity.id())?;
        if local.is_some_and(|existing| existing.meta().version() > incoming) {
            return Ok(ApplyOutcome::Ignored);
        }
        self.store.commit(&ChangeSet::new().with(entity))?;
        Ok(ApplyOutcome::Applied)
    }
}
