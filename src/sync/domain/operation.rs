//! Queued sync operations.

use super::{ParseSyncActionError, RemoteRecord};
use crate::workspace::domain::{Entity, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Auto-incrementing queue position of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(i64);

impl OperationId {
    /// Wraps a raw queue identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw queue identifier.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the remote store should do with the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Insert or replace the record.
    Upsert,
    /// Soft-delete the record.
    Delete,
}

impl SyncAction {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        }
    }

    /// Chooses the action that replicates the entity's current state.
    #[must_use]
    pub const fn for_entity(entity: &Entity) -> Self {
        if entity.meta().is_tombstoned() {
            Self::Delete
        } else {
            Self::Upsert
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SyncAction {
    type Error = ParseSyncActionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(Self::Upsert),
            "delete" => Ok(Self::Delete),
            _ => Err(ParseSyncActionError(value.to_owned())),
        }
    }
}

/// Operation ready to be appended to the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncOperation {
    /// Target entity identifier.
    pub entity_id: Uuid,
    /// Target table.
    pub kind: EntityKind,
    /// Requested action.
    pub action: SyncAction,
    /// Version the payload was based on.
    pub version: u64,
    /// Flat remote-shape record.
    pub payload: serde_json::Value,
    /// Enqueue timestamp.
    pub enqueued_at: DateTime<Utc>,
}

impl NewSyncOperation {
    /// Captures the entity's current state as an operation.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when the entity cannot be encoded.
    pub fn capture(entity: &Entity, enqueued_at: DateTime<Utc>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entity_id: entity.id(),
            kind: entity.kind(),
            action: SyncAction::for_entity(entity),
            version: entity.meta().version(),
            payload: entity.to_json()?,
            enqueued_at,
        })
    }
}

/// Operation stored in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOperation {
    id: OperationId,
    entity_id: Uuid,
    kind: EntityKind,
    action: SyncAction,
    version: u64,
    payload: serde_json::Value,
    enqueued_at: DateTime<Utc>,
}

impl SyncOperation {
    /// Materializes a queued operation.
    #[must_use]
    pub fn new(id: OperationId, operation: NewSyncOperation) -> Self {
        let NewSyncOperation {
            entity_id,
            kind,
            action,
            version,
            payload,
            enqueued_at,
        } = operation;
        Self {
            id,
            entity_id,
            kind,
            action,
            version,
            payload,
            enqueued_at,
        }
    }

    /// Returns the queue identifier.
    #[must_use]
    pub const fn id(&self) -> OperationId {
        self.id
    }

    /// Returns the target entity identifier.
    #[must_use]
    pub const fn entity_id(&self) -> Uuid {
        self.entity_id
    }

    /// Returns the target table.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the requested action.
    #[must_use]
    pub const fn action(&self) -> SyncAction {
        self.action
    }

    /// Returns the version the payload was based on.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the raw payload.
    #[must_use]
    pub const fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Returns when the operation was enqueued.
    #[must_use]
    pub const fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// Moves the operation onto a newer base version.
    pub const fn rebase(&mut self, version: u64) {
        self.version = version;
    }

    /// Builds the remote record carrying this operation's base version.
    ///
    /// Returns `None` when the payload is not a JSON object.
    #[must_use]
    pub fn to_record(&self) -> Option<RemoteRecord> {
        RemoteRecord::from_value(self.kind, self.payload.clone())
            .map(|record| record.with_version(self.version))
    }
}
