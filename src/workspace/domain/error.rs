//! Error types for workspace domain validation and parsing.

use super::{BranchId, TaskId};
use thiserror::Error;

/// Errors returned while constructing or mutating workspace entities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkspaceDomainError {
    /// The project name is empty after trimming.
    #[error("project name must not be empty")]
    EmptyProjectName,

    /// The branch title is empty after trimming.
    #[error("branch title must not be empty")]
    EmptyBranchTitle,

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTaskTitle,

    /// The person name is empty after trimming.
    #[error("person name must not be empty")]
    EmptyPersonName,

    /// A branch cannot list itself as a parent.
    #[error("branch {0} cannot be its own parent")]
    SelfParent(BranchId),

    /// Removing the parent would leave a non-root branch without parents.
    #[error("branch {0} must keep at least one parent")]
    LastParent(BranchId),

    /// A completion timestamp was supplied for an open task.
    #[error("task {0} is not completed; completion timestamp rejected")]
    CompletedAtWithoutCompletion(TaskId),
}

/// Error returned while parsing a branch status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown branch status: {0}")]
pub struct ParseBranchStatusError(pub String);

/// Error returned while parsing a branch kind from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown branch kind: {0}")]
pub struct ParseBranchKindError(pub String);
