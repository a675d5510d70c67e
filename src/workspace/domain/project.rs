//! Project aggregate.

use super::{BranchId, ProjectId, RecordMeta, WorkspaceDomainError};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A workspace project owning a branch hierarchy and its people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    name: String,
    root_branch_id: BranchId,
    #[serde(flatten)]
    meta: RecordMeta,
}

impl Project {
    /// Creates a project pointing at an already allocated root branch.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyProjectName`] when the name is
    /// blank.
    pub fn new(
        name: impl Into<String>,
        root_branch_id: BranchId,
        clock: &impl Clock,
    ) -> Result<Self, WorkspaceDomainError> {
        Ok(Self {
            id: ProjectId::new(),
            name: normalize_name(name.into())?,
            root_branch_id,
            meta: RecordMeta::new(clock),
        })
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn id(&self) -> ProjectId {
        self.id
    }

    /// Returns the project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the designated root branch.
    #[must_use]
    pub const fn root_branch_id(&self) -> BranchId {
        self.root_branch_id
    }

    /// Returns replication metadata.
    #[must_use]
    pub const fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    /// Renames the project.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyProjectName`] when the name is
    /// blank.
    pub fn rename(
        &mut self,
        name: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), WorkspaceDomainError> {
        self.name = normalize_name(name.into())?;
        self.meta.touch(clock);
        Ok(())
    }

    /// Marks the project as soft-deleted.
    pub fn tombstone(&mut self, clock: &impl Clock) {
        self.meta.tombstone(clock);
    }

    pub(crate) const fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

fn normalize_name(name: String) -> Result<String, WorkspaceDomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(WorkspaceDomainError::EmptyProjectName);
    }
    Ok(trimmed.to_owned())
}
