//! Canopy: offline-first work tracking over a DAG of branches.
//!
//! Every mutation is applied to a local store first and recorded in a
//! durable operation queue. A background sync engine replays that queue
//! against a shared remote store with optimistic version checks and pulls
//! remote changes back.
//!
//! # Architecture
//!
//! Canopy follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage and transport
//! - **Adapters**: Concrete implementations of ports (`SQLite`, `PostgreSQL`,
//!   in-memory)
//!
//! # Modules
//!
//! - [`workspace`]: Projects, branches, tasks, and people
//! - [`sync`]: Operation queue, remote store contract, and sync engine
//! - [`config`]: Runtime settings

pub mod config;
pub mod sync;
pub mod workspace;
