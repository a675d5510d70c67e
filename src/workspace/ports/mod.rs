//! Port contracts for workspace persistence.

mod store;

pub use store::{
    LocalStore, LocalStoreError, LocalStoreResult, TaskFilter, sort_people, sort_siblings,
    sort_tasks,
};
