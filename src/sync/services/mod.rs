//! Sync services: the enqueue side, the drain loop, and inbound replication.

mod engine;
mod outbox;
mod replicator;

pub use engine::{EngineSettings, SyncEngine, SyncError, SyncResult};
pub use outbox::Outbox;
pub use replicator::{ApplyOutcome, Replicator};
