//! Runs the Canopy sync loop against a `PostgreSQL` remote.
//!
//! Usage:
//!
//! ```text
//! canopy_sync [config.json]
//! ```
//!
//! The optional JSON file deserializes into [`canopy::config::SyncConfig`];
//! `CANOPY_*` environment variables override it. The process opens the local
//! `SQLite` database, drains its operation queue on every interval, pulls
//! remote changes, and stops on Ctrl-C after the current cycle.

use std::path::PathBuf;
use std::sync::Arc;

use canopy::config::SyncConfig;
use canopy::sync::{adapters::postgres::PostgresRemoteStore, services::SyncEngine};
use canopy::workspace::adapters::sqlite::SqliteLocalStore;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use tokio::runtime::Builder;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = SyncConfig::load(config_path.as_deref())?;
    if !config.online_sync {
        info!("online sync disabled; nothing to do");
        return Ok(());
    }
    let Some(remote_url) = config.remote_database_url.clone() else {
        warn!("no remote database configured; nothing to sync");
        return Ok(());
    };

    let store = Arc::new(SqliteLocalStore::open(&config.local_database_path)?);
    let pool = Pool::builder().build_unchecked(ConnectionManager::<PgConnection>::new(remote_url));
    let remote = Arc::new(PostgresRemoteStore::new(pool));

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async move {
        if let Err(err) = remote.ensure_schema().await {
            warn!(error = %err, "remote schema check failed; will keep retrying through sync");
        }

        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&store),
            store,
            remote,
            config.engine_settings(),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = {
            let background = Arc::clone(&engine);
            tokio::spawn(async move { background.run(shutdown_rx).await })
        };

        info!(
            database = %config.local_database_path,
            interval_secs = config.drain_interval_secs,
            "sync loop started"
        );
        tokio::signal::ctrl_c().await?;
        info!("shutdown requested");
        shutdown_tx.send_replace(true);
        worker.await?;

        let pending = engine.pending_entity_ids()?;
        if !pending.is_empty() {
            warn!(pending = pending.len(), "entities still queued at shutdown");
        }
        Ok::<(), BoxError>(())
    })
}
