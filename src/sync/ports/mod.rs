//! Port contracts for the operation queue, journaled commits, and the remote
//! store.

mod journal;
mod queue;
mod remote;

#[cfg(test)]
pub use remote::MockRemoteStore;
pub use journal::{JournalError, JournalResult, JournaledStore};
pub use queue::{OperationQueue, QueueError, QueueResult};
pub use remote::{RemoteStore, RemoteStoreError, RemoteStoreResult, WriteOutcome};
