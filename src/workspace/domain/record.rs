//! Replication metadata shared by every synchronized entity.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Version assigned to records that have never been acknowledged remotely.
pub const INITIAL_VERSION: u64 = 1;

/// Version, modification time, and tombstone of a record.
///
/// `version` is the last version known to the remote store. Local edits
/// only move `updated_at`; the version advances when the sync engine
/// acknowledges a push or a pull delivers a newer copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    version: u64,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    /// Creates metadata for a freshly created record.
    #[must_use]
    pub fn new(clock: &impl Clock) -> Self {
        Self {
            version: INITIAL_VERSION,
            updated_at: clock.utc(),
            deleted_at: None,
        }
    }

    /// Returns the last known remote version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the tombstone timestamp, if the record is soft-deleted.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns `true` when the record carries a tombstone.
    #[must_use]
    pub const fn is_tombstoned(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub(crate) fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }

    pub(crate) fn tombstone(&mut self, clock: &impl Clock) {
        let now = clock.utc();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub(crate) const fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
