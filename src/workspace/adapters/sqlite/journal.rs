//! [`JournaledStore`] writing entity rows and queue rows in one transaction.

use std::sync::Arc;

use super::{SqliteLocalStore, queue::insert_operation, store::write_entity};
use crate::sync::{
    domain::NewSyncOperation,
    ports::{JournalResult, JournaledStore, OperationQueue},
};
use crate::workspace::{domain::ChangeSet, ports::LocalStoreError};

impl SqliteLocalStore {
    /// Returns `true` when both handles use the same connection.
    #[must_use]
    pub fn shares_connection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}

/// When `queue` is a separate database the entity transaction stays open
/// until the queue append has committed, so a queue failure leaves the
/// entity tables untouched.
impl JournaledStore<Self> for SqliteLocalStore {
    fn commit_journaled(
        &self,
        queue: &Self,
        changes: &ChangeSet,
        operations: Vec<NewSyncOperation>,
    ) -> JournalResult<()> {
        let mut conn = self.lock().map_err(LocalStoreError::persistence)?;
        let tx = conn.transaction().map_err(LocalStoreError::persistence)?;
        for entity in changes.entities() {
            write_entity(&tx, entity)?;
        }
        if self.shares_connection(queue) {
            for operation in &operations {
                insert_operation(&tx, operation)?;
            }
        } else {
            queue.enqueue_all(operations)?;
        }
        tx.commit().map_err(LocalStoreError::persistence)?;
        Ok(())
    }
}
