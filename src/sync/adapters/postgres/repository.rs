//! `PostgreSQL` implementation of the remote store.

use super::{
    models::{PulledRow, VersionRow},
    schema::REMOTE_SCHEMA,
    sql,
};
use crate::sync::{
    domain::{PulledRecord, RemoteRecord},
    ports::{RemoteStore, RemoteStoreError, RemoteStoreResult, WriteOutcome},
};
use crate::workspace::domain::EntityKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Jsonb, Timestamptz};
use tracing::debug;
use uuid::Uuid;

/// `PostgreSQL` connection pool type used by the remote adapter.
pub type RemotePgPool = Pool<ConnectionManager<PgConnection>>;

/// Remote store backed by `PostgreSQL` tables.
#[derive(Debug, Clone)]
pub struct PostgresRemoteStore {
    pool: RemotePgPool,
}

impl PostgresRemoteStore {
    /// Creates a store from a connection pool.
    #[must_use]
    pub const fn new(pool: RemotePgPool) -> Self {
        Self { pool }
    }

    /// Creates the remote tables if they are missing.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError::Unavailable`] when the database cannot be
    /// reached or the DDL fails.
    pub async fn ensure_schema(&self) -> RemoteStoreResult<()> {
        self.run_blocking(|connection| {
            connection
                .batch_execute(REMOTE_SCHEMA)
                .map_err(RemoteStoreError::unavailable)
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> RemoteStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RemoteStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(RemoteStoreError::unavailable)?;
            f(&mut connection)
        })
        .await
        .map_err(RemoteStoreError::unavailable)?
    }
}

#[async_trait]
impl RemoteStore for PostgresRemoteStore {
    async fn upsert(&self, record: &RemoteRecord) -> RemoteStoreResult<u64> {
        let kind = record.kind();
        let payload = record.to_value();
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql::upsert(kind))
                .bind::<Jsonb, _>(payload)
                .get_result::<VersionRow>(connection)
                .map_err(|err| map_write_error(kind, err))?;
            to_version(kind, row.version)
        })
        .await
    }

    async fn update_if_version(
        &self,
        record: &RemoteRecord,
        expected_version: u64,
    ) -> RemoteStoreResult<WriteOutcome> {
        let kind = record.kind();
        let id = record.id().ok_or_else(|| RemoteStoreError::Rejected {
            kind,
            message: "missing or malformed id".to_owned(),
        })?;
        let expected = to_column(kind, expected_version)?;
        let payload = record.to_value();
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql::update_if_version(kind))
                .bind::<Jsonb, _>(payload)
                .bind::<diesel::sql_types::Uuid, _>(id)
                .bind::<BigInt, _>(expected)
                .get_result::<VersionRow>(connection)
                .optional()
                .map_err(|err| map_write_error(kind, err))?;
            to_outcome(kind, row)
        })
        .await
    }

    async fn soft_delete_if_version(
        &self,
        kind: EntityKind,
        id: Uuid,
        expected_version: u64,
        deleted_at: DateTime<Utc>,
    ) -> RemoteStoreResult<WriteOutcome> {
        let expected = to_column(kind, expected_version)?;
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(sql::soft_delete_if_version(kind))
                .bind::<diesel::sql_types::Uuid, _>(id)
                .bind::<BigInt, _>(expected)
                .bind::<Timestamptz, _>(deleted_at)
                .get_result::<VersionRow>(connection)
                .optional()
                .map_err(|err| map_write_error(kind, err))?;
            to_outcome(kind, row)
        })
        .await
    }

    async fn pull(
        &self,
        kind: EntityKind,
        after_revision: i64,
    ) -> RemoteStoreResult<Vec<PulledRecord>> {
        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(sql::pull(kind))
                .bind::<BigInt, _>(after_revision)
                .load::<PulledRow>(connection)
                .map_err(RemoteStoreError::unavailable)?;
            debug!(%kind, after_revision, rows = rows.len(), "pulled remote rows");
            rows.into_iter()
                .map(|row| {
                    RemoteRecord::from_value(kind, row.payload)
                        .map(|record| PulledRecord {
                            record,
                            revision: row.revision,
                        })
                        .ok_or_else(|| RemoteStoreError::Rejected {
                            kind,
                            message: "pulled row is not an object".to_owned(),
                        })
                })
                .collect()
        })
        .await
    }
}

fn to_outcome(kind: EntityKind, row: Option<VersionRow>) -> RemoteStoreResult<WriteOutcome> {
    match row {
        Some(row) => Ok(WriteOutcome::Applied {
            version: to_version(kind, row.version)?,
        }),
        None => Ok(WriteOutcome::Stale),
    }
}

fn to_version(kind: EntityKind, value: i64) -> RemoteStoreResult<u64> {
    u64::try_from(value).map_err(|err| RemoteStoreError::Rejected {
        kind,
        message: format!("negative version {value}: {err}"),
    })
}

fn to_column(kind: EntityKind, version: u64) -> RemoteStoreResult<i64> {
    i64::try_from(version).map_err(|err| RemoteStoreError::Rejected {
        kind,
        message: format!("version {version} out of range: {err}"),
    })
}

/// Constraint and type errors mean the record itself is unacceptable;
/// everything else is treated as a connectivity problem.
fn map_write_error(kind: EntityKind, err: DieselError) -> RemoteStoreError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RemoteStoreError::unavailable(err)
        }
        DieselError::DatabaseError(_, info) => RemoteStoreError::Rejected {
            kind,
            message: info.message().to_owned(),
        },
        DieselError::SerializationError(_) | DieselError::DeserializationError(_) => {
            RemoteStoreError::Rejected {
                kind,
                message: err.to_string(),
            }
        }
        _ => RemoteStoreError::unavailable(err),
    }
}
