//! Diesel row models for raw remote queries.

use diesel::prelude::*;
use serde_json::Value;

/// Version returned by a write.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub struct VersionRow {
    /// Version after the write.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub version: i64,
}

/// Row returned by a pull.
#[derive(Debug, Clone, QueryableByName)]
pub struct PulledRow {
    /// Row encoded as JSON, revision column removed.
    #[diesel(sql_type = diesel::sql_types::Jsonb)]
    pub payload: Value,
    /// Revision stamped by the last write.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub revision: i64,
}
