//! Local store port: durable, key-addressed storage of workspace entities.

use crate::workspace::domain::{
    Branch, BranchId, ChangeSet, Entity, EntityKind, Person, PersonId, Project, ProjectId, Task,
    TaskId,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for local store operations.
pub type LocalStoreResult<T> = Result<T, LocalStoreError>;

/// Which tasks a branch listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    /// Open and completed tasks.
    #[default]
    All,
    /// Open tasks only.
    OpenOnly,
}

impl TaskFilter {
    /// Returns `true` when `task` passes the filter.
    #[must_use]
    pub const fn admits(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::OpenOnly => !task.completed(),
        }
    }
}

/// Local persistence contract.
///
/// Point lookups return tombstoned records so replication can compare
/// versions; every listing excludes them. Listings are ordered: branches and
/// people by `(position, id)` / `(name, id)`, tasks open-first then by
/// `(position, id)`.
pub trait LocalStore: Send + Sync {
    /// Finds a project by identifier, including tombstoned rows.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn project(&self, id: ProjectId) -> LocalStoreResult<Option<Project>>;

    /// Lists live projects.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn projects(&self) -> LocalStoreResult<Vec<Project>>;

    /// Finds a branch by identifier, including tombstoned rows.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn branch(&self, id: BranchId) -> LocalStoreResult<Option<Branch>>;

    /// Lists live branches of a project.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn branches_in_project(&self, project_id: ProjectId) -> LocalStoreResult<Vec<Branch>>;

    /// Lists live branches that name `parent_id` among their parents.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn children_of(&self, parent_id: BranchId) -> LocalStoreResult<Vec<Branch>>;

    /// Finds a task by identifier, including tombstoned rows.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn task(&self, id: TaskId) -> LocalStoreResult<Option<Task>>;

    /// Lists live tasks of a branch.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn tasks_in_branch(&self, branch_id: BranchId, filter: TaskFilter)
    -> LocalStoreResult<Vec<Task>>;

    /// Finds a person by identifier, including tombstoned rows.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn person(&self, id: PersonId) -> LocalStoreResult<Option<Person>>;

    /// Lists live people of a project.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn people_in_project(&self, project_id: ProjectId) -> LocalStoreResult<Vec<Person>>;

    /// Counts every person ever added to a project, tombstoned ones included.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn person_count(&self, project_id: ProjectId) -> LocalStoreResult<usize>;

    /// Writes every record of the change set, replacing existing copies.
    ///
    /// Readers observe either none or all of the records.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails; nothing is
    /// written in that case.
    fn commit(&self, changes: &ChangeSet) -> LocalStoreResult<()>;

    /// Finds any record by kind and raw identifier, including tombstoned rows.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStoreError::Persistence`] when storage fails.
    fn entity(&self, kind: EntityKind, id: Uuid) -> LocalStoreResult<Option<Entity>> {
        Ok(match kind {
            EntityKind::Project => self.project(ProjectId::from_uuid(id))?.map(Entity::Project),
            EntityKind::Branch => self.branch(BranchId::from_uuid(id))?.map(Entity::Branch),
            EntityKind::Task => self.task(TaskId::from_uuid(id))?.map(Entity::Task),
            EntityKind::Person => self.person(PersonId::from_uuid(id))?.map(Entity::Person),
        })
    }
}

/// Errors returned by local store implementations.
#[derive(Debug, Clone, Error)]
pub enum LocalStoreError {
    /// A stored record could not be decoded.
    #[error("corrupt {kind} record {id}: {message}")]
    Corrupt {
        /// Record kind.
        kind: EntityKind,
        /// Record identifier.
        id: Uuid,
        /// Decoder message.
        message: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LocalStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

/// Sorts branches by sibling order, breaking ties by identifier.
pub fn sort_siblings(branches: &mut [Branch]) {
    branches.sort_by_key(|branch| (branch.position(), branch.id()));
}

/// Sorts tasks open-first, then by position, breaking ties by identifier.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by_key(|task| (task.completed(), task.position(), task.id()));
}

/// Sorts people by name, breaking ties by identifier.
pub fn sort_people(people: &mut [Person]) {
    people.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(&b.id())));
}
