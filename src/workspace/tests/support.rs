//! Shared fixtures for workspace tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;

use crate::sync::{adapters::memory::InMemoryOperationQueue, services::Outbox};
use crate::workspace::{adapters::memory::InMemoryLocalStore, services::Workspace};

/// Clock pinned to one instant so timestamps and sprint years are stable.
#[derive(Debug, Clone, Copy)]
pub(super) struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0)
                .single()
                .expect("valid fixed instant"),
        )
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) type TestWorkspace = Workspace<InMemoryLocalStore, InMemoryOperationQueue, FixedClock>;

pub(super) struct Harness {
    pub store: Arc<InMemoryLocalStore>,
    pub queue: Arc<InMemoryOperationQueue>,
    pub clock: FixedClock,
    pub workspace: TestWorkspace,
}

#[fixture]
pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryLocalStore::new());
    let queue = Arc::new(InMemoryOperationQueue::new());
    let clock = FixedClock::default();
    let workspace = Workspace::new(&store, &Outbox::new(Arc::clone(&queue)), &Arc::new(clock));
    Harness {
        store,
        queue,
        clock,
        workspace,
    }
}
