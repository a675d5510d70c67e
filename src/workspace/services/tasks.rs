//! Service layer for tasks within branches.

use std::collections::HashSet;
use std::sync::Arc;

use mockable::Clock;
use tracing::debug;

use super::{
    MoveDirection, WorkspaceError, WorkspaceResult,
    writer::{WorkspaceWriter, next_position, swap_with_neighbour},
};
use crate::sync::{
    ports::{JournaledStore, OperationQueue},
    services::Outbox,
};
use crate::workspace::{
    domain::{BranchId, ChangeSet, Task, TaskId, TaskPatch},
    ports::TaskFilter,
};

/// Task orchestration service.
pub struct TaskService<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    writer: WorkspaceWriter<S, Q, C>,
}

impl<S, Q, C> Clone for TaskService<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

impl<S, Q, C> TaskService<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    /// Creates a new task service.
    #[must_use]
    pub const fn new(store: Arc<S>, outbox: Outbox<Q>, clock: Arc<C>) -> Self {
        Self {
            writer: WorkspaceWriter::new(store, outbox, clock),
        }
    }

    /// Lists the live tasks of a branch, open tasks first.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn list_tasks(&self, branch_id: BranchId, filter: TaskFilter) -> WorkspaceResult<Vec<Task>> {
        Ok(self.writer.store.tasks_in_branch(branch_id, filter)?)
    }

    /// Returns a live task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::TaskNotFound`] for missing or tombstoned
    /// tasks.
    pub fn task(&self, id: TaskId) -> WorkspaceResult<Task> {
        self.writer.live_task(id)
    }

    /// Appends an open task to a branch.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::BranchNotFound`] or
    /// [`WorkspaceError::Validation`] for a blank title.
    pub fn add_task(&self, branch_id: BranchId, title: &str) -> WorkspaceResult<Task> {
        self.writer.live_branch(branch_id)?;
        let position = self.next_task_position(branch_id)?;
        let task = Task::new(branch_id, title, position, &*self.writer.clock)?;
        self.writer.commit(&ChangeSet::new().with(task.clone()))?;
        Ok(task)
    }

    /// Patches a task.
    ///
    /// Completing without an explicit `completed_at` stamps the current time;
    /// reopening clears it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::TaskNotInBranch`] when the task lives
    /// elsewhere, [`WorkspaceError::PersonNotFound`] for an unknown assignee,
    /// or [`WorkspaceError::Validation`].
    pub fn update_task(
        &self,
        branch_id: BranchId,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> WorkspaceResult<Task> {
        let mut task = self.task_in_branch(branch_id, task_id)?;
        if let Some(Some(person_id)) = patch.assignee_id {
            self.writer.live_person(person_id)?;
        }
        task.apply(patch, &*self.writer.clock)?;
        self.writer.commit(&ChangeSet::new().with(task.clone()))?;
        Ok(task)
    }

    /// Tombstones a task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::TaskNotFound`] for a missing task.
    pub fn delete_task(&self, task_id: TaskId) -> WorkspaceResult<()> {
        let mut task = self.writer.live_task(task_id)?;
        task.tombstone(&*self.writer.clock);
        self.writer.commit(&ChangeSet::new().with(task))
    }

    /// Swaps a task with its neighbour among tasks of the same branch and
    /// completion state.
    ///
    /// Returns `false` at either end of that list. Peers sharing a position
    /// are renumbered first so the swap is always visible.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::TaskNotInBranch`] or
    /// [`WorkspaceError::TaskNotFound`].
    pub fn move_task(
        &self,
        branch_id: BranchId,
        task_id: TaskId,
        direction: MoveDirection,
    ) -> WorkspaceResult<bool> {
        let task = self.task_in_branch(branch_id, task_id)?;
        let peers: Vec<Task> = self
            .writer
            .store
            .tasks_in_branch(branch_id, TaskFilter::All)?
            .into_iter()
            .filter(|peer| peer.completed() == task.completed())
            .collect();
        let index = peers
            .iter()
            .position(|peer| peer.id() == task_id)
            .ok_or(WorkspaceError::TaskNotFound(task_id))?;
        let Some(neighbour_index) = direction.neighbour(index, peers.len()) else {
            return Ok(false);
        };
        let changes = swap_with_neighbour(peers, index, neighbour_index, &*self.writer.clock);
        self.writer.commit(&changes)?;
        Ok(true)
    }

    /// Reassigns a task to another branch, appending it there.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::TaskNotInBranch`] when the task is not in
    /// `source_branch_id`, or [`WorkspaceError::BranchNotFound`] for the
    /// target.
    pub fn move_task_to_branch(
        &self,
        task_id: TaskId,
        source_branch_id: BranchId,
        target_branch_id: BranchId,
    ) -> WorkspaceResult<Task> {
        let mut task = self.task_in_branch(source_branch_id, task_id)?;
        if source_branch_id == target_branch_id {
            return Ok(task);
        }
        self.writer.live_branch(target_branch_id)?;
        let position = self.next_task_position(target_branch_id)?;
        task.move_to(target_branch_id, position, &*self.writer.clock);
        self.writer.commit(&ChangeSet::new().with(task.clone()))?;
        Ok(task)
    }

    /// Adds one open task per non-blank line whose title is not already an
    /// open task of the branch. Existing tasks are never removed or
    /// reordered. Returns the tasks that were added.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::BranchNotFound`] or store and queue errors.
    pub fn bulk_update_tasks(&self, branch_id: BranchId, lines: &str) -> WorkspaceResult<Vec<Task>> {
        self.writer.live_branch(branch_id)?;
        let open = self
            .writer
            .store
            .tasks_in_branch(branch_id, TaskFilter::OpenOnly)?;
        let mut known: HashSet<String> = open.iter().map(|task| task.title().to_owned()).collect();
        let mut position = self.next_task_position(branch_id)?;

        let clock = &*self.writer.clock;
        let mut added = Vec::new();
        for title in lines.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if !known.insert(title.to_owned()) {
                continue;
            }
            added.push(Task::new(branch_id, title, position, clock)?);
            position = position.saturating_add(1);
        }

        let changes = added
            .iter()
            .cloned()
            .fold(ChangeSet::new(), ChangeSet::with);
        self.writer.commit(&changes)?;
        debug!(%branch_id, added = added.len(), "bulk task update");
        Ok(added)
    }

    /// Moves each task from the source branch to the target branch in
    /// order.
    ///
    /// # Errors
    ///
    /// Stops at the first task that cannot be moved and returns its error;
    /// tasks moved before it stay moved.
    pub fn bulk_move_tasks(
        &self,
        task_ids: &[TaskId],
        source_branch_id: BranchId,
        target_branch_id: BranchId,
    ) -> WorkspaceResult<Vec<Task>> {
        task_ids
            .iter()
            .map(|task_id| self.move_task_to_branch(*task_id, source_branch_id, target_branch_id))
            .collect()
    }

    fn task_in_branch(&self, branch_id: BranchId, task_id: TaskId) -> WorkspaceResult<Task> {
        let task = self.writer.live_task(task_id)?;
        if task.branch_id() != branch_id {
            return Err(WorkspaceError::TaskNotInBranch { task_id, branch_id });
        }
        Ok(task)
    }

    fn next_task_position(&self, branch_id: BranchId) -> WorkspaceResult<i64> {
        let tasks = self
            .writer
            .store
            .tasks_in_branch(branch_id, TaskFilter::All)?;
        Ok(next_position(tasks.iter().map(Task::position)))
    }
}
