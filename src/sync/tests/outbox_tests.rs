//! Outbox tests.

use std::sync::Arc;

use chrono::Utc;
use mockable::DefaultClock;
use rstest::rstest;

use crate::sync::{
    adapters::memory::InMemoryOperationQueue, domain::SyncAction, ports::OperationQueue,
    services::Outbox,
};
use crate::workspace::{
    adapters::memory::InMemoryLocalStore,
    domain::{Branch, BranchId, ChangeSet, EntityKind, Project},
    ports::LocalStore,
};

fn change_set() -> (Project, Branch, ChangeSet) {
    let clock = DefaultClock;
    let root_id = BranchId::new();
    let project = Project::new("Atlas", root_id, &clock).expect("project");
    let mut root = Branch::new_root(root_id, project.id(), "Atlas", &clock).expect("root");
    root.tombstone(&clock);
    let changes = ChangeSet::new().with(project.clone()).with(root.clone());
    (project, root, changes)
}

#[rstest]
fn commit_enqueues_one_operation_per_record_in_order() {
    let store = InMemoryLocalStore::new();
    let queue = Arc::new(InMemoryOperationQueue::new());
    let outbox = Outbox::new(Arc::clone(&queue));
    let (project, root, changes) = change_set();
    let at = Utc::now();

    outbox.commit(&store, &changes, at).expect("commit");

    let pending = queue.pending().expect("queue");
    let summary: Vec<_> = pending
        .iter()
        .map(|op| (op.kind(), op.entity_id(), op.action(), op.version()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (EntityKind::Project, project.id().into_inner(), SyncAction::Upsert, 1),
            (EntityKind::Branch, root.id().into_inner(), SyncAction::Delete, 1),
        ]
    );
    assert!(pending.iter().all(|op| op.enqueued_at() == at));
    assert_eq!(store.project(project.id()).expect("lookup"), Some(project));
}

#[rstest]
#[case(true, 2)]
#[case(false, 0)]
fn online_sync_flag_controls_recording(#[case] online_sync: bool, #[case] expected: usize) {
    let store = InMemoryLocalStore::new();
    let queue = Arc::new(InMemoryOperationQueue::new());
    let outbox = Outbox::from_flag(Arc::clone(&queue), online_sync);
    let (project, _, changes) = change_set();

    outbox.commit(&store, &changes, Utc::now()).expect("commit");

    assert_eq!(outbox.is_enabled(), online_sync);
    assert!(store.project(project.id()).expect("lookup").is_some());
    assert_eq!(queue.pending().expect("queue").len(), expected);
}
