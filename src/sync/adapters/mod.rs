//! Adapter implementations for the operation queue and remote store ports.

pub mod memory;
pub mod postgres;
