//! In-memory adapters for the queue and remote ports.

mod queue;
mod remote;

pub use queue::InMemoryOperationQueue;
pub use remote::InMemoryRemoteStore;
