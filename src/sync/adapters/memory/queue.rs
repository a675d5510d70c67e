//! In-memory operation queue.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::sync::{
    domain::{NewSyncOperation, OperationId, SyncOperation},
    ports::{OperationQueue, QueueError, QueueResult},
};
use crate::workspace::domain::EntityKind;
use uuid::Uuid;

/// Thread-safe FIFO queue backed by a vector.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOperationQueue {
    state: Arc<Mutex<QueueState>>,
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: i64,
    operations: Vec<SyncOperation>,
}

impl InMemoryOperationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> QueueResult<MutexGuard<'_, QueueState>> {
        self.state
            .lock()
            .map_err(|err| QueueError::persistence(std::io::Error::other(err.to_string())))
    }
}

impl OperationQueue for InMemoryOperationQueue {
    fn enqueue(&self, operation: NewSyncOperation) -> QueueResult<OperationId> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = OperationId::new(state.next_id);
        state.operations.push(SyncOperation::new(id, operation));
        Ok(id)
    }

    fn enqueue_all(&self, operations: Vec<NewSyncOperation>) -> QueueResult<Vec<OperationId>> {
        let mut state = self.lock()?;
        let mut ids = Vec::with_capacity(operations.len());
        for operation in operations {
            state.next_id += 1;
            let id = OperationId::new(state.next_id);
            state.operations.push(SyncOperation::new(id, operation));
            ids.push(id);
        }
        Ok(ids)
    }

    fn pending(&self) -> QueueResult<Vec<SyncOperation>> {
        Ok(self.lock()?.operations.clone())
    }

    fn remove(&self, id: OperationId) -> QueueResult<()> {
        self.lock()?.operations.retain(|operation| operation.id() != id);
        Ok(())
    }

    fn rebase(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        from_version: u64,
        to_version: u64,
    ) -> QueueResult<usize> {
        let mut state = self.lock()?;
        let mut updated = 0;
        for operation in state.operations.iter_mut().filter(|operation| {
            operation.kind() == kind
                && operation.entity_id() == entity_id
                && operation.version() == from_version
        }) {
            operation.rebase(to_version);
            updated += 1;
        }
        Ok(updated)
    }
}
