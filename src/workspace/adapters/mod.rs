//! Adapter implementations for the local store port.

pub mod memory;
pub mod sqlite;
