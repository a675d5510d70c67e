//! In-memory remote store shared between simulated replicas.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::sync::{
    domain::{PulledRecord, RemoteRecord},
    ports::{RemoteStore, RemoteStoreError, RemoteStoreResult, WriteOutcome},
};
use crate::workspace::domain::EntityKind;

/// Remote store kept in process memory.
///
/// Clones share the same rows, so two sync engines holding clones behave
/// like two replicas of one remote database. [`Self::set_offline`] makes
/// every call fail with [`RemoteStoreError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemoteStore {
    state: Arc<Mutex<RemoteState>>,
    offline: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct RemoteState {
    revision: i64,
    rows: HashMap<(EntityKind, Uuid), RemoteRow>,
}

#[derive(Debug, Clone)]
struct RemoteRow {
    record: RemoteRecord,
    revision: i64,
}

impl RemoteState {
    fn write(&mut self, id: Uuid, record: RemoteRecord) {
        self.revision += 1;
        let revision = self.revision;
        self.rows
            .insert((record.kind(), id), RemoteRow { record, revision });
    }
}

impl InMemoryRemoteStore {
    /// Creates an empty remote store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing or regaining connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns the current copy of a row, tombstoned or not.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError::Unavailable`] when the store is offline.
    pub fn get(&self, kind: EntityKind, id: Uuid) -> RemoteStoreResult<Option<RemoteRecord>> {
        let state = self.lock()?;
        Ok(state.rows.get(&(kind, id)).map(|row| row.record.clone()))
    }

    fn lock(&self) -> RemoteStoreResult<MutexGuard<'_, RemoteState>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteStoreError::unavailable(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "remote store offline",
            )));
        }
        self.state
            .lock()
            .map_err(|err| RemoteStoreError::unavailable(std::io::Error::other(err.to_string())))
    }
}

fn record_id(record: &RemoteRecord) -> RemoteStoreResult<Uuid> {
    record.id().ok_or_else(|| RemoteStoreError::Rejected {
        kind: record.kind(),
        message: "missing or malformed id".to_owned(),
    })
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn upsert(&self, record: &RemoteRecord) -> RemoteStoreResult<u64> {
        let id = record_id(record)?;
        let mut state = self.lock()?;
        let version = state
            .rows
            .get(&(record.kind(), id))
            .map_or(1, |row| row.record.version() + 1);
        state.write(id, record.clone().with_version(version));
        Ok(version)
    }

    async fn update_if_version(
        &self,
        record: &RemoteRecord,
        expected_version: u64,
    ) -> RemoteStoreResult<WriteOutcome> {
        let id = record_id(record)?;
        let mut state = self.lock()?;
        let matches = state
            .rows
            .get(&(record.kind(), id))
            .is_some_and(|row| row.record.version() == expected_version);
        if !matches {
            return Ok(WriteOutcome::Stale);
        }
        let version = expected_version + 1;
        state.write(id, record.clone().with_version(version));
        Ok(WriteOutcome::Applied { version })
    }

    async fn soft_delete_if_version(
        &self,
        kind: EntityKind,
        id: Uuid,
        expected_version: u64,
        deleted_at: DateTime<Utc>,
    ) -> RemoteStoreResult<WriteOutcome> {
        let mut state = self.lock()?;
        let Some(row) = state
            .rows
            .get(&(kind, id))
            .filter(|row| row.record.version() == expected_version)
        else {
            return Ok(WriteOutcome::Stale);
        };

        let stamp = Value::from(deleted_at.to_rfc3339());
        let mut fields = row.record.fields().clone();
        fields.insert("deleted_at".to_owned(), stamp.clone());
        fields.insert("updated_at".to_owned(), stamp);
        let version = expected_version + 1;
        let record = RemoteRecord::from_value(kind, Value::Object(fields))
            .map(|record| record.with_version(version))
            .ok_or_else(|| RemoteStoreError::Rejected {
                kind,
                message: "stored row is not an object".to_owned(),
            })?;
        state.write(id, record);
        Ok(WriteOutcome::Applied { version })
    }

    async fn pull(
        &self,
        kind: EntityKind,
        after_revision: i64,
    ) -> RemoteStoreResult<Vec<PulledRecord>> {
        let state = self.lock()?;
        let mut pulled: Vec<PulledRecord> = state
            .rows
            .iter()
            .filter(|((row_kind, _), row)| *row_kind == kind && row.revision > after_revision)
            .map(|(_, row)| PulledRecord {
                record: row.record.clone(),
                revision: row.revision,
            })
            .collect();
        pulled.sort_by_key(|record| record.revision);
        Ok(pulled)
    }
}
