//! Replica harness shared by the sync tests.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;

use crate::sync::{
    adapters::memory::{InMemoryOperationQueue, InMemoryRemoteStore},
    services::{EngineSettings, SyncEngine},
};
use crate::workspace::{adapters::memory::InMemoryLocalStore, services::Workspace};

pub(super) type TestEngine =
    SyncEngine<InMemoryLocalStore, InMemoryOperationQueue, InMemoryRemoteStore>;

/// Short timings so failure paths finish quickly.
pub(super) const fn fast_settings() -> EngineSettings {
    EngineSettings {
        drain_interval: Duration::from_millis(10),
        remote_timeout: Duration::from_millis(50),
    }
}

/// One device: a local store, its queue, the services, and an engine.
pub(super) struct Replica {
    pub store: Arc<InMemoryLocalStore>,
    pub queue: Arc<InMemoryOperationQueue>,
    pub workspace: Workspace<InMemoryLocalStore, InMemoryOperationQueue, DefaultClock>,
    pub engine: TestEngine,
}

impl Replica {
    /// Builds a replica whose engine talks to `remote`.
    pub(super) fn connect(remote: &InMemoryRemoteStore) -> Self {
        let store = Arc::new(InMemoryLocalStore::new());
        let queue = Arc::new(InMemoryOperationQueue::new());
        let engine = SyncEngine::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::new(remote.clone()),
            fast_settings(),
        );
        let workspace = Workspace::new(&store, &engine.outbox(), &Arc::new(DefaultClock));
        Self {
            store,
            queue,
            workspace,
            engine,
        }
    }
}
