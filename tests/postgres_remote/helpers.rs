//! Per-test databases, a fixed clock, and record builders.

use super::cluster::PostgresCluster;
use canopy::sync::{adapters::postgres::PostgresRemoteStore, domain::RemoteRecord};
use canopy::workspace::domain::Entity;
use chrono::{DateTime, Local, Utc};
use diesel::Connection as _;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use eyre::{Result, eyre};
use mockable::Clock;
use rstest::fixture;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Pull visibility is bounded by the cluster-wide oldest running
/// transaction, so tests take turns rather than stall each other's pulls.
static CLUSTER_TURN: Mutex<()> = Mutex::const_new(());

/// Clock pinned to a whole second, which survives `timestamptz` unchanged.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// 2025-03-14 09:00:00 UTC.
#[fixture]
pub fn clock() -> FixedClock {
    FixedClock(DateTime::from_timestamp(1_741_942_800, 0).unwrap_or_default())
}

/// A freshly migrated database holding only the remote tables.
///
/// The database is dropped with the value.
pub struct RemoteDb {
    /// Store under test.
    pub store: PostgresRemoteStore,
    url: String,
    name: String,
    cluster: PostgresCluster,
    _turn: MutexGuard<'static, ()>,
}

impl RemoteDb {
    /// Opens a second session, independent of the store's pool.
    pub fn connect(&self) -> Result<PgConnection> {
        Ok(PgConnection::establish(&self.url)?)
    }
}

impl Drop for RemoteDb {
    fn drop(&mut self) {
        if let Err(err) = self.cluster.drop_database(&self.name) {
            tracing::warn!(database = %self.name, error = %err, "failed to drop test database");
        }
    }
}

/// Creates a database, points a store at it, and applies the remote schema.
pub async fn remote_db(cluster: PostgresCluster) -> Result<RemoteDb> {
    let turn = CLUSTER_TURN.lock().await;
    let name = format!("canopy_{}", Uuid::new_v4().simple());
    cluster
        .create_database(&name)
        .map_err(|err| eyre!("create database {name}: {err}"))?;
    let url = cluster.database_url(&name);
    let pool = Pool::builder()
        .max_size(2)
        .build(ConnectionManager::<PgConnection>::new(url.clone()))?;
    let db = RemoteDb {
        store: PostgresRemoteStore::new(pool),
        url,
        name,
        cluster,
        _turn: turn,
    };
    db.store.ensure_schema().await?;
    Ok(db)
}

/// Encodes an entity in remote shape.
pub fn record_of(entity: impl Into<Entity>) -> Result<RemoteRecord> {
    Ok(RemoteRecord::from_entity(&entity.into())?)
}

/// Re-encodes a pulled row through the domain type, so it can be compared
/// with a record built locally.
pub fn normalized(record: RemoteRecord) -> Result<RemoteRecord> {
    record_of(record.into_entity()?)
}
