//! Flat, snake-case records exchanged with the remote store.

use crate::workspace::domain::{Entity, EntityKind};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A remote row: `id`, entity fields, `version`, `updated_at`, `deleted_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    kind: EntityKind,
    fields: Map<String, Value>,
}

impl RemoteRecord {
    /// Wraps a JSON object as a record of the given kind.
    ///
    /// Returns `None` when `value` is not an object.
    #[must_use]
    pub fn from_value(kind: EntityKind, value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { kind, fields }),
            _ => None,
        }
    }

    /// Encodes an entity in remote shape.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when the entity cannot be encoded.
    pub fn from_entity(entity: &Entity) -> Result<Self, serde_json::Error> {
        let value = entity.to_json()?;
        Self::from_value(entity.kind(), value).ok_or_else(|| {
            serde::ser::Error::custom(format!("{} did not encode as an object", entity.kind()))
        })
    }

    /// Returns the target table.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the raw column map.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns the record identifier, if present and well formed.
    #[must_use]
    pub fn id(&self) -> Option<Uuid> {
        self.fields
            .get("id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    /// Returns the record version, defaulting to zero when absent.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.fields.get("version").and_then(Value::as_u64).unwrap_or(0)
    }

    /// Returns the tombstone timestamp, if set and well formed.
    #[must_use]
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.fields
            .get("deleted_at")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc))
    }

    /// Returns a copy carrying `version`.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.fields.insert("version".to_owned(), Value::from(version));
        self
    }

    /// Returns the record as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Decodes the record into a domain entity.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error when the columns do not match the
    /// entity shape.
    pub fn into_entity(self) -> Result<Entity, serde_json::Error> {
        Entity::from_json(self.kind, Value::Object(self.fields))
    }
}

/// A record delivered by a pull together with its remote revision.
#[derive(Debug, Clone, PartialEq)]
pub struct PulledRecord {
    /// The record.
    pub record: RemoteRecord,
    /// Monotonic remote revision assigned at write time.
    pub revision: i64,
}
