//! Aggregate sync status, user notices, and cycle reports.

use crate::workspace::domain::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Process-visible state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No cycle has completed yet.
    #[default]
    Idle,
    /// A cycle is running.
    Syncing,
    /// The last cycle reached the remote and left the queue empty.
    Synced,
    /// The last cycle hit a transient failure; work remains queued.
    Error,
}

impl SyncStatus {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a queued operation was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// The remote version no longer matched the queued base version.
    VersionConflict,
    /// The payload could not be turned into a remote record.
    InvalidPayload,
}

/// Non-fatal, dismissible notification about a discarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncNotice {
    /// Affected entity.
    pub entity_id: Uuid,
    /// Affected table.
    pub kind: EntityKind,
    /// Why the operation was dropped.
    pub reason: DiscardReason,
}

impl fmt::Display for SyncNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            DiscardReason::VersionConflict => write!(
                f,
                "{} {} was changed elsewhere; local edit discarded in favour of the remote copy",
                self.kind, self.entity_id
            ),
            DiscardReason::InvalidPayload => write!(
                f,
                "{} {} could not be sent and was discarded",
                self.kind, self.entity_id
            ),
        }
    }
}

/// Tally of one drain pass over the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DrainReport {
    /// Operations acknowledged and removed.
    pub acked: usize,
    /// Operations discarded as conflicts.
    pub conflicted: usize,
    /// Operations left queued after a transient failure.
    pub retried: usize,
    /// `true` when another drain was already running and this one did nothing.
    pub skipped: bool,
}

impl DrainReport {
    /// Returns a report for a drain that yielded to a running one.
    #[must_use]
    pub const fn skipped() -> Self {
        Self {
            acked: 0,
            conflicted: 0,
            retried: 0,
            skipped: true,
        }
    }
}

/// Tally of one pull pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PullReport {
    /// Records that replaced or created local copies.
    pub applied: usize,
    /// Records older than the local copy.
    pub ignored: usize,
}

/// Outcome of a full sync cycle (drain then pull).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CycleReport {
    /// Drain tally.
    pub drain: DrainReport,
    /// Pull tally, absent when the pull failed transiently.
    pub pull: Option<PullReport>,
    /// Status published at the end of the cycle.
    pub status: SyncStatus,
}
