//! Service layer for projects and the branch DAG.

use std::collections::{HashSet, VecDeque};
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
    domain::{
        Branch, BranchId, BranchKind, BranchPatch, ChangeSet, DEFAULT_BRANCH_TITLE, PersonId,
        Project, ProjectId,
    },
    ports::TaskFilter,
};

/// Projects and branch hierarchy orchestration service.
///
/// Every mutation is applied synchronously to the local store and, when
/// online sync is enabled, enqueued for replication.
pub struct HierarchyService<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    writer: WorkspaceWriter<S, Q, C>,
}

impl<S, Q, C> Clone for HierarchyService<S, Q, C>
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

impl<S, Q, C> HierarchyService<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    /// Creates a new hierarchy service.
    #[must_use]
    pub const fn new(store: Arc<S>, outbox: Outbox<Q>, clock: Arc<C>) -> Self {
        Self {
            writer: WorkspaceWriter::new(store, outbox, clock),
        }
    }

    /// Creates a project together with its root branch.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Validation`] for a blank name, or store and
    /// queue errors.
    pub fn create_project(&self, name: &str) -> WorkspaceResult<Project> {
        let clock = &*self.writer.clock;
        let root_id = BranchId::new();
        let project = Project::new(name, root_id, clock)?;
        let root = Branch::new_root(root_id, project.id(), project.name(), clock)?;
        self.writer
            .commit(&ChangeSet::new().with(project.clone()).with(root))?;
        Ok(project)
    }

    /// Renames a project.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::ProjectNotFound`] or
    /// [`WorkspaceError::Validation`].
    pub fn rename_project(&self, id: ProjectId, name: &str) -> WorkspaceResult<Project> {
        let mut project = self.writer.live_project(id)?;
        project.rename(name, &*self.writer.clock)?;
        self.writer.commit(&ChangeSet::new().with(project.clone()))?;
        Ok(project)
    }

    /// Tombstones a project. Its branches, tasks, and people stay in place
    /// but the project disappears from listings.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::ProjectNotFound`] or store and queue errors.
    pub fn delete_project(&self, id: ProjectId) -> WorkspaceResult<()> {
        let mut project = self.writer.live_project(id)?;
        project.tombstone(&*self.writer.clock);
        self.writer.commit(&ChangeSet::new().with(project))
    }

    /// Lists live projects.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn projects(&self) -> WorkspaceResult<Vec<Project>> {
        Ok(self.writer.store.projects()?)
    }

    /// Returns a live branch.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::BranchNotFound`] for missing or tombstoned
    /// branches.
    pub fn branch(&self, id: BranchId) -> WorkspaceResult<Branch> {
        self.writer.live_branch(id)
    }

    /// Lists live branches of a project in sibling order.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn list_branches(&self, project_id: ProjectId) -> WorkspaceResult<Vec<Branch>> {
        Ok(self.writer.store.branches_in_project(project_id)?)
    }

    /// Lists the live children of a branch ordered by `(position, id)`.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn children(&self, parent_id: BranchId) -> WorkspaceResult<Vec<Branch>> {
        Ok(self.writer.store.children_of(parent_id)?)
    }

    /// Creates a branch under `parent_id`.
    ///
    /// Without an explicit title the branch is named
    /// [`DEFAULT_BRANCH_TITLE`], or sequenced as `"{parent} {YY}-{n}"` when
    /// the parent is a sprint. The new child and the advanced sprint counter
    /// are written as one unit.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::BranchNotFound`] when the parent is missing
    /// and [`WorkspaceError::Validation`] for a blank title.
    pub fn add_branch(&self, parent_id: BranchId, title: Option<&str>) -> WorkspaceResult<Branch> {
        let clock = &*self.writer.clock;
        let mut parent = self.writer.live_branch(parent_id)?;
        let siblings = self.writer.store.children_of(parent_id)?;
        let position = next_position(siblings.iter().map(Branch::position));

        let mut changes = ChangeSet::new();
        let resolved = match title {
            Some(explicit) => explicit.to_owned(),
            None if parent.kind() == BranchKind::Sprint => {
                let sequenced = parent.next_sprint_title(clock);
                changes.push(parent.clone());
                sequenced
            }
            None => DEFAULT_BRANCH_TITLE.to_owned(),
        };

        let child = Branch::new_child(&parent, resolved, position, clock)?;
        changes.push(child.clone());
        self.writer.commit(&changes)?;
        Ok(child)
    }

    /// Adds `parent_id` to the parents of `child_id`.
    ///
    /// Returns `false` when the edge already existed.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::CycleDetected`] when `child_id` is already an
    /// ancestor of `parent_id`, [`WorkspaceError::CrossProjectLink`] across
    /// projects, and [`WorkspaceError::BranchNotFound`] for missing branches.
    pub fn link_branch(&self, child_id: BranchId, parent_id: BranchId) -> WorkspaceResult<bool> {
        let mut child = self.writer.live_branch(child_id)?;
        let parent = self.writer.live_branch(parent_id)?;
        if child.is_root() {
            return Err(WorkspaceError::RootBranchProtected(child_id));
        }
        if child.project_id() != parent.project_id() {
            return Err(WorkspaceError::CrossProjectLink {
                child: child_id,
                parent: parent_id,
            });
        }
        if child.has_parent(parent_id) {
            return Ok(false);
        }
        if self.is_ancestor_or_self(child_id, &parent)? {
            debug!(%child_id, %parent_id, "rejected link that would create a cycle");
            return Err(WorkspaceError::CycleDetected {
                child: child_id,
                parent: parent_id,
            });
        }

        child.add_parent(parent_id, &*self.writer.clock)?;
        self.writer.commit(&ChangeSet::new().with(child))?;
        Ok(true)
    }

    /// Removes `parent_id` from the parents of `child_id`.
    ///
    /// Returns `false` when the edge did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Validation`] when the edge is the child's
    /// last parent.
    pub fn unlink_branch(&self, child_id: BranchId, parent_id: BranchId) -> WorkspaceResult<bool> {
        let mut child = self.writer.live_branch(child_id)?;
        if !child.remove_parent(parent_id, &*self.writer.clock)? {
            return Ok(false);
        }
        self.writer.commit(&ChangeSet::new().with(child))?;
        Ok(true)
    }

    /// Swaps the branch with its neighbour under its first parent.
    ///
    /// Returns `false` at either end of the sibling list. Siblings sharing a
    /// position are renumbered first so the swap is always visible.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::BranchNotFound`] for a missing branch.
    pub fn move_branch(&self, id: BranchId, direction: MoveDirection) -> WorkspaceResult<bool> {
        let branch = self.writer.live_branch(id)?;
        let Some(parent_id) = branch.parent_ids().first().copied() else {
            return Ok(false);
        };
        let siblings = self.writer.store.children_of(parent_id)?;
        let index = siblings
            .iter()
            .position(|sibling| sibling.id() == id)
            .ok_or(WorkspaceError::BranchNotFound(id))?;
        let Some(neighbour) = direction.neighbour(index, siblings.len()) else {
            return Ok(false);
        };

        let changes = swap_with_neighbour(siblings, index, neighbour, &*self.writer.clock);
        self.writer.commit(&changes)?;
        Ok(true)
    }

    /// Patches the supplied fields and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::PersonNotFound`] when the patch names an
    /// unknown responsible person, or [`WorkspaceError::Validation`].
    pub fn update_branch(&self, id: BranchId, patch: BranchPatch) -> WorkspaceResult<Branch> {
        let mut branch = self.writer.live_branch(id)?;
        if let Some(Some(person_id)) = patch.responsible_id {
            self.writer.live_person(person_id)?;
        }
        branch.apply(patch, &*self.writer.clock)?;
        self.writer.commit(&ChangeSet::new().with(branch.clone()))?;
        Ok(branch)
    }

    /// Flips the archived flag of one branch; descendants keep their own.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::BranchNotFound`] for a missing branch.
    pub fn toggle_branch_archive(&self, id: BranchId) -> WorkspaceResult<Branch> {
        let mut branch = self.writer.live_branch(id)?;
        branch.toggle_archived(&*self.writer.clock);
        self.writer.commit(&ChangeSet::new().with(branch.clone()))?;
        Ok(branch)
    }

    /// Tombstones a branch, its tasks, and every descendant whose live
    /// parents are all being deleted. Returns the deleted branch ids.
    ///
    /// A descendant that is still reachable through another live parent
    /// survives.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::RootBranchProtected`] for a project root.
    pub fn delete_branch(&self, id: BranchId) -> WorkspaceResult<Vec<BranchId>> {
        let target = self.writer.live_branch(id)?;
        if target.is_root() {
            return Err(WorkspaceError::RootBranchProtected(id));
        }

        let doomed = self.collect_doomed(target)?;
        let clock = &*self.writer.clock;
        let mut changes = ChangeSet::new();
        let mut deleted = Vec::with_capacity(doomed.len());
        for mut branch in doomed {
            for mut task in self
                .writer
                .store
                .tasks_in_branch(branch.id(), TaskFilter::All)?
            {
                task.tombstone(clock);
                changes.push(task);
            }
            branch.tombstone(clock);
            deleted.push(branch.id());
            changes.push(branch);
        }
        self.writer.commit(&changes)?;
        debug!(branch_id = %id, deleted = deleted.len(), "deleted branch subtree");
        Ok(deleted)
    }

    fn collect_doomed(&self, root: Branch) -> WorkspaceResult<Vec<Branch>> {
        let mut doomed_ids = HashSet::from([root.id()]);
        let mut frontier = vec![root.id()];
        let mut doomed = vec![root];

        while let Some(current) = frontier.pop() {
            for child in self.writer.store.children_of(current)? {
                if doomed_ids.contains(&child.id()) {
                    continue;
                }
                let mut orphaned = true;
                for parent_id in child.parent_ids() {
                    if doomed_ids.contains(parent_id) {
                        continue;
                    }
                    if self.is_live(*parent_id)? {
                        orphaned = false;
                        break;
                    }
                }
                if orphaned {
                    doomed_ids.insert(child.id());
                    frontier.push(child.id());
                    doomed.push(child);
                }
            }
        }
        Ok(doomed)
    }

    /// Resolves who is accountable for a branch.
    ///
    /// Returns the branch's own responsible person, or walks up through the
    /// first live parent until one is found. Returns `None` at the root. The
    /// walk is an explicit loop with a visited set, so it terminates within
    /// the depth of the hierarchy even if the store holds a cycle.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::BranchNotFound`] when the starting branch is
    /// missing or tombstoned.
    pub fn effective_responsible(&self, id: BranchId) -> WorkspaceResult<Option<PersonId>> {
        let mut current = self.writer.live_branch(id)?;
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(current.id()) {
                return Ok(None);
            }
            if let Some(person_id) = current.responsible_id() {
                return Ok(Some(person_id));
            }
            match self.first_live_parent(&current)? {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    fn first_live_parent(&self, branch: &Branch) -> WorkspaceResult<Option<Branch>> {
        for parent_id in branch.parent_ids() {
            if let Some(parent) = self.writer.store.branch(*parent_id)? {
                if !parent.meta().is_tombstoned() {
                    return Ok(Some(parent));
                }
            }
        }
        Ok(None)
    }

    fn is_live(&self, id: BranchId) -> WorkspaceResult<bool> {
        Ok(self
            .writer
            .store
            .branch(id)?
            .is_some_and(|branch| !branch.meta().is_tombstoned()))
    }

    /// Walks every ancestor of `start` (inclusive) looking for `target`.
    fn is_ancestor_or_self(&self, target: BranchId, start: &Branch) -> WorkspaceResult<bool> {
        let mut visited = HashSet::from([start.id()]);
        let mut queue: VecDeque<BranchId> = VecDeque::from([start.id()]);
        while let Some(current) = queue.pop_front() {
            if current == target {
                return Ok(true);
            }
            let Some(branch) = self.writer.store.branch(current)? else {
                continue;
            };
            for parent_id in branch.parent_ids() {
                if visited.insert(*parent_id) {
                    queue.push_back(*parent_id);
                }
            }
        }
        Ok(false)
    }
}
