//! Application services for the work hierarchy.

mod error;
mod hierarchy;
mod people;
mod tasks;
mod writer;

use std::sync::Arc;

use mockable::Clock;

use crate::sync::{
    ports::{JournaledStore, OperationQueue},
    services::Outbox,
};

pub use error::{WorkspaceError, WorkspaceResult};
pub use hierarchy::HierarchyService;
pub use people::{AddPersonRequest, PersonService};
pub use tasks::TaskService;

/// Direction for sibling reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    /// Towards the start of the list (`prev` / `up`).
    Previous,
    /// Towards the end of the list (`next` / `down`).
    Next,
}

impl MoveDirection {
    /// Returns the index adjacent to `index` in a list of `len` items.
    #[must_use]
    pub fn neighbour(self, index: usize, len: usize) -> Option<usize> {
        match self {
            Self::Previous => index.checked_sub(1),
            Self::Next => index.checked_add(1).filter(|next| *next < len),
        }
    }
}

/// The three workspace services sharing one store, outbox, and clock.
pub struct Workspace<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    /// Projects and branch hierarchy operations.
    pub hierarchy: HierarchyService<S, Q, C>,
    /// Task operations.
    pub tasks: TaskService<S, Q, C>,
    /// Person operations.
    pub people: PersonService<S, Q, C>,
}

impl<S, Q, C> Workspace<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    /// Wires the services to shared collaborators.
    #[must_use]
    pub fn new(store: &Arc<S>, outbox: &Outbox<Q>, clock: &Arc<C>) -> Self {
        Self {
            hierarchy: HierarchyService::new(Arc::clone(store), outbox.clone(), Arc::clone(clock)),
            tasks: TaskService::new(Arc::clone(store), outbox.clone(), Arc::clone(clock)),
            people: PersonService::new(Arc::clone(store), outbox.clone(), Arc::clone(clock)),
        }
    }
}
