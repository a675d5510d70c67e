//! Shared plumbing for workspace services: live lookups and committing.

use std::sync::Arc;

use mockable::Clock;

use super::{WorkspaceError, WorkspaceResult};
use crate::sync::{
    ports::{JournaledStore, OperationQueue},
    services::Outbox,
};
use crate::workspace::domain::{
    Branch, BranchId, ChangeSet, Entity, Person, PersonId, Project, ProjectId, Task, TaskId,
};

/// Store, outbox, and clock shared by the workspace services.
pub(crate) struct WorkspaceWriter<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    pub(crate) store: Arc<S>,
    outbox: Outbox<Q>,
    pub(crate) clock: Arc<C>,
}

impl<S, Q, C> Clone for WorkspaceWriter<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            outbox: self.outbox.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, Q, C> WorkspaceWriter<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    pub(crate) const fn new(store: Arc<S>, outbox: Outbox<Q>, clock: Arc<C>) -> Self {
        Self {
            store,
            outbox,
            clock,
        }
    }

    /// Writes the change set and its sync operations as one unit.
    pub(crate) fn commit(&self, changes: &ChangeSet) -> WorkspaceResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.outbox
            .commit(self.store.as_ref(), changes, self.clock.utc())?;
        Ok(())
    }

    pub(crate) fn live_project(&self, id: ProjectId) -> WorkspaceResult<Project> {
        self.store
            .project(id)?
            .filter(|project| !project.meta().is_tombstoned())
            .ok_or(WorkspaceError::ProjectNotFound(id))
    }

    pub(crate) fn live_branch(&self, id: BranchId) -> WorkspaceResult<Branch> {
        self.store
            .branch(id)?
            .filter(|branch| !branch.meta().is_tombstoned())
            .ok_or(WorkspaceError::BranchNotFound(id))
    }

    pub(crate) fn live_task(&self, id: TaskId) -> WorkspaceResult<Task> {
        self.store
            .task(id)?
            .filter(|task| !task.meta().is_tombstoned())
            .ok_or(WorkspaceError::TaskNotFound(id))
    }

    pub(crate) fn live_person(&self, id: PersonId) -> WorkspaceResult<Person> {
        self.store
            .person(id)?
            .filter(|person| !person.meta().is_tombstoned())
            .ok_or(WorkspaceError::PersonNotFound(id))
    }
}

/// Returns the position after the largest one in `positions`, or zero.
pub(crate) fn next_position(positions: impl IntoIterator<Item = i64>) -> i64 {
    positions
        .into_iter()
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Records ordered among their siblings by an integer position.
pub(crate) trait Positioned: Into<Entity> {
    fn position(&self) -> i64;
    fn set_position(&mut self, position: i64, clock: &impl Clock);
}

impl Positioned for Branch {
    fn position(&self) -> i64 {
        Self::position(self)
    }

    fn set_position(&mut self, position: i64, clock: &impl Clock) {
        Self::set_position(self, position, clock);
    }
}

impl Positioned for Task {
    fn position(&self) -> i64 {
        Self::position(self)
    }

    fn set_position(&mut self, position: i64, clock: &impl Clock) {
        Self::set_position(self, position, clock);
    }
}

/// Swaps the positions of `items[index]` and `items[neighbour]` and returns
/// every record whose position changed.
///
/// `items` must be in listing order. When any two positions tie the whole
/// list is renumbered `0..n` first, so the swap always yields distinct,
/// strictly increasing positions.
pub(crate) fn swap_with_neighbour<T>(
    mut items: Vec<T>,
    index: usize,
    neighbour: usize,
    clock: &impl Clock,
) -> ChangeSet
where
    T: Positioned,
{
    let original: Vec<i64> = items.iter().map(T::position).collect();
    let tied = original.iter().zip(original.iter().skip(1)).any(|(a, b)| a == b);
    if tied {
        for (ordinal, item) in (0_i64..).zip(items.iter_mut()) {
            if item.position() != ordinal {
                item.set_position(ordinal, clock);
            }
        }
    }

    let (Some(first), Some(second)) = (
        items.get(index).map(T::position),
        items.get(neighbour).map(T::position),
    ) else {
        return ChangeSet::new();
    };
    if let Some(item) = items.get_mut(index) {
        item.set_position(second, clock);
    }
    if let Some(item) = items.get_mut(neighbour) {
        item.set_position(first, clock);
    }

    let mut changes = ChangeSet::new();
    for (item, before) in items.into_iter().zip(original) {
        if item.position() != before {
            changes.push(item);
        }
    }
    changes
}
