//! Task entity owned by exactly one branch.

use super::{BranchId, PersonId, RecordMeta, TaskId, WorkspaceDomainError};
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Partial update applied by [`Task::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New assignee.
    pub assignee_id: Option<Option<PersonId>>,
    /// New due date.
    pub due_date: Option<Option<NaiveDate>>,
    /// New completion state.
    pub completed: Option<bool>,
    /// Explicit completion timestamp. Only honoured for completed tasks.
    pub completed_at: Option<DateTime<Utc>>,
    /// New pinned flag.
    pub pinned: Option<bool>,
}

/// A unit of work inside a branch.
///
/// `completed_at` is present exactly when `completed` is `true`. The
/// position orders tasks among those sharing the same branch and completion
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    branch_id: BranchId,
    title: String,
    description: String,
    assignee_id: Option<PersonId>,
    due_date: Option<NaiveDate>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    pinned: bool,
    position: i64,
    #[serde(flatten)]
    meta: RecordMeta,
}

impl Task {
    /// Creates an open task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyTaskTitle`] when the title is
    /// blank.
    pub fn new(
        branch_id: BranchId,
        title: impl Into<String>,
        position: i64,
        clock: &impl Clock,
    ) -> Result<Self, WorkspaceDomainError> {
        Ok(Self {
            id: TaskId::new(),
            branch_id,
            title: normalize_title(title.into())?,
            description: String::new(),
            assignee_id: None,
            due_date: None,
            completed: false,
            completed_at: None,
            pinned: false,
            position,
            meta: RecordMeta::new(clock),
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning branch.
    #[must_use]
    pub const fn branch_id(&self) -> BranchId {
        self.branch_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee_id(&self) -> Option<PersonId> {
        self.assignee_id
    }

    /// Returns the due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Returns whether the task is completed.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.completed
    }

    /// Returns when the task was completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns whether the task is pinned.
    #[must_use]
    pub const fn pinned(&self) -> bool {
        self.pinned
    }

    /// Returns the ordering key within `(branch, completed)`.
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    /// Returns replication metadata.
    #[must_use]
    pub const fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Completing a task without an explicit timestamp stamps the current
    /// time; reopening it clears the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyTaskTitle`] for a blank title and
    /// [`WorkspaceDomainError::CompletedAtWithoutCompletion`] when a
    /// completion timestamp targets an open task. The task is left untouched
    /// on error.
    pub fn apply(&mut self, patch: TaskPatch, clock: &impl Clock) -> Result<(), WorkspaceDomainError> {
        let title = patch.title.map(normalize_title).transpose()?;
        let completion = self.resolve_completion(patch.completed, patch.completed_at, clock)?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(assignee_id) = patch.assignee_id {
            self.assignee_id = assignee_id;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(pinned) = patch.pinned {
            self.pinned = pinned;
        }
        (self.completed, self.completed_at) = completion;
        self.meta.touch(clock);
        Ok(())
    }

    fn resolve_completion(
        &self,
        completed: Option<bool>,
        completed_at: Option<DateTime<Utc>>,
        clock: &impl Clock,
    ) -> Result<(bool, Option<DateTime<Utc>>), WorkspaceDomainError> {
        match (completed, completed_at) {
            (Some(false), _) => Ok((false, None)),
            (Some(true), Some(at)) => Ok((true, Some(at))),
            (Some(true), None) if self.completed => Ok((true, self.completed_at)),
            (Some(true), None) => Ok((true, Some(clock.utc()))),
            (None, Some(at)) if self.completed => Ok((true, Some(at))),
            (None, Some(_)) => Err(WorkspaceDomainError::CompletedAtWithoutCompletion(self.id)),
            (None, None) => Ok((self.completed, self.completed_at)),
        }
    }

    /// Reassigns the task to another branch at the given position.
    pub fn move_to(&mut self, branch_id: BranchId, position: i64, clock: &impl Clock) {
        self.branch_id = branch_id;
        self.position = position;
        self.meta.touch(clock);
    }

    /// Sets the ordering key.
    pub fn set_position(&mut self, position: i64, clock: &impl Clock) {
        self.position = position;
        self.meta.touch(clock);
    }

    /// Marks the task as soft-deleted.
    pub fn tombstone(&mut self, clock: &impl Clock) {
        self.meta.tombstone(clock);
    }

    pub(crate) const fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

fn normalize_title(title: String) -> Result<String, WorkspaceDomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(WorkspaceDomainError::EmptyTaskTitle);
    }
    Ok(trimmed.to_owned())
}
