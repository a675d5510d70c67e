//! `SQLite` adapter holding workspace entities and the sync queue in one
//! database file.
//!
//! Entities are stored as their JSON body plus the columns listings filter
//! on. Branch parent edges are mirrored into `branch_parents` so child
//! lookups use an index instead of scanning bodies.

mod journal;
mod migrations;
mod queue;
mod store;

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::workspace::ports::{LocalStoreError, LocalStoreResult};

pub use migrations::CURRENT_SCHEMA_VERSION;

/// Shared handle to the local `SQLite` database.
///
/// Implements both [`crate::workspace::ports::LocalStore`] and
/// [`crate::sync::ports::OperationQueue`]; clones share one connection.
#[derive(Debug, Clone)]
pub struct SqliteLocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLocalStore {
    /// Opens or creates the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns the `SQLite` error when the file cannot be opened or migrated.
    pub fn open(path: &str) -> rusqlite::Result<Self> {
        Ok(Self::from_connection(migrations::open_connection(path)?))
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns the `SQLite` error when the schema cannot be created.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Ok(Self::from_connection(migrations::open_in_memory()?))
    }

    /// Returns the applied schema version.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when the version cannot be
    /// read.
    pub fn schema_version(&self) -> LocalStoreResult<i64> {
        let conn = self.lock().map_err(LocalStoreError::persistence)?;
        migrations::schema_version(&conn).map_err(LocalStoreError::persistence)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, std::io::Error> {
        self.conn
            .lock()
            .map_err(|err| std::io::Error::other(err.to_string()))
    }
}
