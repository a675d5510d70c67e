//! Service-level errors for workspace mutations and queries.

use crate::sync::ports::{JournalError, QueueError};
use crate::workspace::{
    domain::{BranchId, PersonId, ProjectId, TaskId, WorkspaceDomainError},
    ports::LocalStoreError,
};
use thiserror::Error;

/// Errors returned by the hierarchy, task, and person services.
///
/// Validation and not-found variants are raised before anything is
/// written. Network state never surfaces here: remote failures belong to
/// the sync engine.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// Domain validation failed.
    #[error(transparent)]
    Validation(#[from] WorkspaceDomainError),

    /// No live project has the identifier.
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    /// No live branch has the identifier.
    #[error("branch {0} not found")]
    BranchNotFound(BranchId),

    /// No live task has the identifier.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// No live person has the identifier.
    #[error("person {0} not found")]
    PersonNotFound(PersonId),

    /// The task belongs to another branch than the one named.
    #[error("task {task_id} does not belong to branch {branch_id}")]
    TaskNotInBranch {
        /// Task identifier.
        task_id: TaskId,
        /// Branch named by the caller.
        branch_id: BranchId,
    },

    /// Linking would connect branches of different projects.
    #[error("cannot link branch {child} under {parent}: different projects")]
    CrossProjectLink {
        /// Prospective child.
        child: BranchId,
        /// Prospective parent.
        parent: BranchId,
    },

    /// Linking would make a branch its own ancestor.
    #[error("cannot link branch {child} under {parent}: would create a cycle")]
    CycleDetected {
        /// Prospective child.
        child: BranchId,
        /// Prospective parent.
        parent: BranchId,
    },

    /// The project root cannot be deleted or re-parented.
    #[error("branch {0} is a project root")]
    RootBranchProtected(BranchId),

    /// Local store failure.
    #[error(transparent)]
    Store(#[from] LocalStoreError),

    /// Sync queue failure.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl WorkspaceError {
    /// Returns `true` for errors caused by invalid input rather than
    /// storage failures.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Queue(_))
    }
}

/// Result type for workspace service operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

impl From<JournalError> for WorkspaceError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Store(inner) => Self::Store(inner),
            JournalError::Queue(inner) => Self::Queue(inner),
        }
    }
}
