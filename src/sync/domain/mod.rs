//! Domain model for offline-first replication.
//!
//! Local mutations become [`SyncOperation`]s in a durable queue. The engine
//! pushes them as [`RemoteRecord`]s with optimistic version checks and folds
//! the outcome back into [`SyncStatus`] and [`SyncNotice`]s.

mod operation;
mod record;
mod status;

pub use operation::{NewSyncOperation, OperationId, SyncAction, SyncOperation};
pub use record::{PulledRecord, RemoteRecord};
pub use status::{CycleReport, DiscardReason, DrainReport, PullReport, SyncNotice, SyncStatus};

use thiserror::Error;

/// Error returned while parsing a sync action from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown sync action: {0}")]
pub struct ParseSyncActionError(pub String);
