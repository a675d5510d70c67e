//! Offline-first replication between the local store and a remote store.
//!
//! Workspace services commit every change through an [`services::Outbox`],
//! which writes the records and their [`ports::OperationQueue`] entries as
//! one unit via [`ports::JournaledStore`]. The
//! [`services::SyncEngine`] drains that queue against a
//! [`ports::RemoteStore`] with optimistic version checks, then pulls remote
//! changes back and applies them last-writer-wins by version.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
