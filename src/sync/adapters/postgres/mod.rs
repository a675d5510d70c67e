//! `PostgreSQL` adapter for the remote store port.

mod models;
mod repository;
mod schema;
mod sql;

pub use repository::{PostgresRemoteStore, RemotePgPool};
pub use schema::REMOTE_SCHEMA;
