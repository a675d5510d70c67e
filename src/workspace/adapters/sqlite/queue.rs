//! [`OperationQueue`] over the `sync_operations` table.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use super::SqliteLocalStore;
use crate::sync::{
    domain::{NewSyncOperation, OperationId, SyncAction, SyncOperation},
    ports::{OperationQueue, QueueError, QueueResult},
};
use crate::workspace::domain::EntityKind;

/// Raw columns of one queue row, decoded after the statement finishes.
struct QueueRow {
    id: i64,
    entity_id: String,
    table_name: String,
    action: String,
    version: i64,
    payload: String,
    enqueued_at: String,
}

impl QueueRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity_id: row.get(1)?,
            table_name: row.get(2)?,
            action: row.get(3)?,
            version: row.get(4)?,
            payload: row.get(5)?,
            enqueued_at: row.get(6)?,
        })
    }

    fn decode(self) -> QueueResult<SyncOperation> {
        let id = OperationId::new(self.id);
        let corrupt = |message: String| QueueError::Corrupt { id, message };

        let entity_id = Uuid::parse_str(&self.entity_id).map_err(|err| corrupt(err.to_string()))?;
        let kind = EntityKind::from_table_name(&self.table_name)
            .ok_or_else(|| corrupt(format!("unknown table {}", self.table_name)))?;
        let action =
            SyncAction::try_from(self.action.as_str()).map_err(|err| corrupt(err.to_string()))?;
        let version = u64::try_from(self.version).map_err(|err| corrupt(err.to_string()))?;
        let payload = serde_json::from_str(&self.payload).map_err(|err| corrupt(err.to_string()))?;
        let enqueued_at = DateTime::parse_from_rfc3339(&self.enqueued_at)
            .map_err(|err| corrupt(err.to_string()))?
            .with_timezone(&Utc);

        Ok(SyncOperation::new(
            id,
            NewSyncOperation {
                entity_id,
                kind,
                action,
                version,
                payload,
                enqueued_at,
            },
        ))
    }
}

fn to_column(version: u64) -> QueueResult<i64> {
    i64::try_from(version).map_err(|err| QueueError::Encode(err.to_string()))
}

/// Inserts one operation on `conn`, which may be an open transaction.
pub(super) fn insert_operation(
    conn: &Connection,
    operation: &NewSyncOperation,
) -> QueueResult<OperationId> {
    let version = to_column(operation.version)?;
    conn.execute(
        "INSERT INTO sync_operations \
         (entity_id, table_name, action, version, payload, enqueued_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            operation.entity_id.to_string(),
            operation.kind.table_name(),
            operation.action.as_str(),
            version,
            operation.payload.to_string(),
            operation.enqueued_at.to_rfc3339(),
        ],
    )
    .map_err(QueueError::persistence)?;
    Ok(OperationId::new(conn.last_insert_rowid()))
}

impl OperationQueue for SqliteLocalStore {
    fn enqueue(&self, operation: NewSyncOperation) -> QueueResult<OperationId> {
        let conn = self.lock().map_err(QueueError::persistence)?;
        insert_operation(&conn, &operation)
    }

    fn enqueue_all(&self, operations: Vec<NewSyncOperation>) -> QueueResult<Vec<OperationId>> {
        let mut conn = self.lock().map_err(QueueError::persistence)?;
        let tx = conn.transaction().map_err(QueueError::persistence)?;
        let ids = operations
            .iter()
            .map(|operation| insert_operation(&tx, operation))
            .collect::<QueueResult<Vec<_>>>()?;
        tx.commit().map_err(QueueError::persistence)?;
        Ok(ids)
    }

    fn pending(&self) -> QueueResult<Vec<SyncOperation>> {
        let conn = self.lock().map_err(QueueError::persistence)?;
        let mut statement = conn
            .prepare(
                "SELECT id, entity_id, table_name, action, version, payload, enqueued_at \
                 FROM sync_operations ORDER BY id",
            )
            .map_err(QueueError::persistence)?;
        let rows = statement
            .query_map([], QueueRow::read)
            .map_err(QueueError::persistence)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(QueueError::persistence)?;
        rows.into_iter().map(QueueRow::decode).collect()
    }

    fn remove(&self, id: OperationId) -> QueueResult<()> {
        let conn = self.lock().map_err(QueueError::persistence)?;
        conn.execute(
            "DELETE FROM sync_operations WHERE id = ?1",
            params![id.value()],
        )
        .map_err(QueueError::persistence)?;
        Ok(())
    }

    fn rebase(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        from_version: u64,
        to_version: u64,
    ) -> QueueResult<usize> {
        let (from, to) = (to_column(from_version)?, to_column(to_version)?);
        let conn = self.lock().map_err(QueueError::persistence)?;
        conn.execute(
            "UPDATE sync_operations SET version = ?1 \
             WHERE table_name = ?2 AND entity_id = ?3 AND version = ?4",
            params![to, kind.table_name(), entity_id.to_string(), from],
        )
        .map_err(QueueError::persistence)
    }

    fn pending_entity_ids(&self) -> QueueResult<BTreeSet<Uuid>> {
        let conn = self.lock().map_err(QueueError::persistence)?;
        let mut statement = conn
            .prepare("SELECT DISTINCT entity_id FROM sync_operations")
            .map_err(QueueError::persistence)?;
        let raw = statement
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(QueueError::persistence)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(QueueError::persistence)?;
        raw.iter()
            .map(|id| {
                Uuid::parse_str(id).map_err(|err| QueueError::Encode(format!("{id}: {err}")))
            })
            .collect()
    }
}
