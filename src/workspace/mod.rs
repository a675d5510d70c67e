//! The work hierarchy: projects, a DAG of branches, tasks, and people.
//!
//! Services validate and apply mutations against a [`ports::LocalStore`]
//! synchronously, then hand the committed records to the sync outbox.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
