//! In-memory local store for tests and ephemeral workspaces.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::sync::{
    domain::NewSyncOperation,
    ports::{JournalResult, JournaledStore, OperationQueue},
};
use crate::workspace::{
    domain::{Branch, BranchId, ChangeSet, Entity, Person, PersonId, Project, ProjectId, Task, TaskId},
    ports::{
        LocalStore, LocalStoreError, LocalStoreResult, TaskFilter, sort_people, sort_siblings,
        sort_tasks,
    },
};

/// Thread-safe in-memory local store.
///
/// A reverse index from parent to children backs [`LocalStore::children_of`]
/// and is rebuilt from `parent_ids` on every branch write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocalStore {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    projects: HashMap<ProjectId, Project>,
    branches: HashMap<BranchId, Branch>,
    tasks: HashMap<TaskId, Task>,
    people: HashMap<PersonId, Person>,
    children_index: HashMap<BranchId, BTreeSet<BranchId>>,
}

impl InMemoryLocalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LocalStoreResult<RwLockReadGuard<'_, InMemoryState>> {
        self.state
            .read()
            .map_err(|err| LocalStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> LocalStoreResult<RwLockWriteGuard<'_, InMemoryState>> {
        self.state
            .write()
            .map_err(|err| LocalStoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

impl InMemoryState {
    fn put_branch(&mut self, branch: &Branch) {
        if let Some(previous) = self.branches.get(&branch.id()) {
            for parent_id in previous.parent_ids() {
                if let Some(children) = self.children_index.get_mut(parent_id) {
                    children.remove(&branch.id());
                }
            }
        }
        for parent_id in branch.parent_ids() {
            self.children_index
                .entry(*parent_id)
                .or_default()
                .insert(branch.id());
        }
        self.branches.insert(branch.id(), branch.clone());
    }

    fn put(&mut self, entity: &Entity) {
        match entity {
            Entity::Project(project) => {
                self.projects.insert(project.id(), project.clone());
            }
            Entity::Branch(branch) => self.put_branch(branch),
            Entity::Task(task) => {
                self.tasks.insert(task.id(), task.clone());
            }
            Entity::Person(person) => {
                self.people.insert(person.id(), person.clone());
            }
        }
    }
}

impl LocalStore for InMemoryLocalStore {
    fn project(&self, id: ProjectId) -> LocalStoreResult<Option<Project>> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    fn projects(&self) -> LocalStoreResult<Vec<Project>> {
        let state = self.read()?;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|project| !project.meta().is_tombstoned())
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(&b.id())));
        Ok(projects)
    }

    fn branch(&self, id: BranchId) -> LocalStoreResult<Option<Branch>> {
        Ok(self.read()?.branches.get(&id).cloned())
    }

    fn branches_in_project(&self, project_id: ProjectId) -> LocalStoreResult<Vec<Branch>> {
        let state = self.read()?;
        let mut branches: Vec<Branch> = state
            .branches
            .values()
            .filter(|branch| branch.project_id() == project_id && !branch.meta().is_tombstoned())
            .cloned()
            .collect();
        sort_siblings(&mut branches);
        Ok(branches)
    }

    fn children_of(&self, parent_id: BranchId) -> LocalStoreResult<Vec<Branch>> {
        let state = self.read()?;
        let mut children: Vec<Branch> = state
            .children_index
            .get(&parent_id)
            .into_iter()
            .flatten()
            .filter_map(|child_id| state.branches.get(child_id))
            .filter(|branch| !branch.meta().is_tombstoned())
            .cloned()
            .collect();
        sort_siblings(&mut children);
        Ok(children)
    }

    fn task(&self, id: TaskId) -> LocalStoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    fn tasks_in_branch(
        &self,
        branch_id: BranchId,
        filter: TaskFilter,
    ) -> LocalStoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| {
                task.branch_id() == branch_id && !task.meta().is_tombstoned() && filter.admits(task)
            })
            .cloned()
            .collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    fn person(&self, id: PersonId) -> LocalStoreResult<Option<Person>> {
        Ok(self.read()?.people.get(&id).cloned())
    }

    fn people_in_project(&self, project_id: ProjectId) -> LocalStoreResult<Vec<Person>> {
        let state = self.read()?;
        let mut people: Vec<Person> = state
            .people
            .values()
            .filter(|person| person.project_id() == project_id && !person.meta().is_tombstoned())
            .cloned()
            .collect();
        sort_people(&mut people);
        Ok(people)
    }

    fn person_count(&self, project_id: ProjectId) -> LocalStoreResult<usize> {
        let state = self.read()?;
        Ok(state
            .people
            .values()
            .filter(|person| person.project_id() == project_id)
            .count())
    }

    fn commit(&self, changes: &ChangeSet) -> LocalStoreResult<()> {
        let mut state = self.write()?;
        for entity in changes.entities() {
            state.put(entity);
        }
        Ok(())
    }
}

/// Holds the store's write lock across the queue append, so readers never see
/// records whose operations failed to queue.
impl<Q> JournaledStore<Q> for InMemoryLocalStore
where
    Q: OperationQueue,
{
    fn commit_journaled(
        &self,
        queue: &Q,
        changes: &ChangeSet,
        operations: Vec<NewSyncOperation>,
    ) -> JournalResult<()> {
        let mut state = self.write()?;
        queue.enqueue_all(operations)?;
        for entity in changes.entities() {
            state.put(entity);
        }
        Ok(())
    }
}
