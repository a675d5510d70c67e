//! Domain model for the work hierarchy.
//!
//! Projects own a DAG of branches; branches own ordered tasks; people are
//! attached to projects. Every record carries [`RecordMeta`] so it can be
//! replicated with optimistic concurrency control.

mod branch;
mod entity;
mod error;
mod ids;
mod person;
mod project;
mod record;
mod task;

pub use branch::{Branch, BranchKind, BranchPatch, BranchStatus, DEFAULT_BRANCH_TITLE};
pub use entity::{ChangeSet, Entity, EntityKind};
pub use error::{ParseBranchKindError, ParseBranchStatusError, WorkspaceDomainError};
pub use ids::{BranchId, PersonId, ProjectId, TaskId};
pub use person::{PERSON_PALETTE, Person, PersonPatch, initials_of};
pub use project::Project;
pub use record::{INITIAL_VERSION, RecordMeta};
pub use task::{Task, TaskPatch};
