//! End-to-end offline-first scenarios over the `SQLite` local store.
//!
//! Each replica keeps entities and its operation queue in its own `SQLite`
//! database and syncs through a shared in-memory remote store.

use std::sync::Arc;

use canopy::sync::{
    adapters::memory::InMemoryRemoteStore,
    domain::{DiscardReason, SyncStatus},
    services::{EngineSettings, SyncEngine},
};
use canopy::workspace::{
    adapters::sqlite::SqliteLocalStore,
    domain::{BranchPatch, TaskPatch},
    ports::{LocalStore, TaskFilter},
    services::{AddPersonRequest, MoveDirection, Workspace},
};
use eyre::{Result, ensure, eyre};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use uuid::Uuid;

type Engine = SyncEngine<SqliteLocalStore, SqliteLocalStore, InMemoryRemoteStore>;

struct Replica {
    store: Arc<SqliteLocalStore>,
    workspace: Workspace<SqliteLocalStore, SqliteLocalStore, DefaultClock>,
    engine: Engine,
}

fn replica_on(store: SqliteLocalStore, remote: &InMemoryRemoteStore) -> Replica {
    let store = Arc::new(store);
    let engine = SyncEngine::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::new(remote.clone()),
        EngineSettings::default(),
    );
    let workspace = Workspace::new(&store, &engine.outbox(), &Arc::new(DefaultClock));
    Replica {
        store,
        workspace,
        engine,
    }
}

fn replica(remote: &InMemoryRemoteStore) -> Result<Replica> {
    Ok(replica_on(SqliteLocalStore::open_in_memory()?, remote))
}

#[fixture]
fn remote() -> InMemoryRemoteStore {
    InMemoryRemoteStore::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn work_done_offline_reaches_another_replica(remote: InMemoryRemoteStore) -> Result<()> {
    let laptop = replica(&remote)?;
    let phone = replica(&remote)?;
    remote.set_offline(true);

    let project = laptop.workspace.hierarchy.create_project("Atlas")?;
    let root = project.root_branch_id();
    let design = laptop.workspace.hierarchy.add_branch(root, Some("Design"))?;
    let build = laptop.workspace.hierarchy.add_branch(root, Some("Build"))?;
    laptop
        .workspace
        .hierarchy
        .move_branch(build.id(), MoveDirection::Previous)?;
    let lead = laptop
        .workspace
        .people
        .add_person(AddPersonRequest::new(project.id(), "Ada Lovelace"))?;
    laptop.workspace.hierarchy.update_branch(
        design.id(),
        BranchPatch {
            responsible_id: Some(Some(lead.id())),
            ..BranchPatch::default()
        },
    )?;
    let task = laptop.workspace.tasks.add_task(design.id(), "Sketch")?;
    laptop.workspace.tasks.update_task(
        design.id(),
        task.id(),
        TaskPatch {
            completed: Some(true),
            ..TaskPatch::default()
        },
    )?;

    let offline = laptop.engine.run_cycle().await?;
    ensure!(offline.status == SyncStatus::Error, "cycle should fail offline");
    ensure!(
        laptop.engine.pending_entity_ids()?.len() == 6,
        "project, root, two branches, person, and task stay queued"
    );

    remote.set_offline(false);
    let online = laptop.engine.run_cycle().await?;
    ensure!(online.status == SyncStatus::Synced, "cycle should succeed");
    ensure!(laptop.engine.pending_entity_ids()?.is_empty(), "queue drained");

    phone.engine.run_cycle().await?;
    let titles: Vec<String> = phone
        .workspace
        .hierarchy
        .children(root)?
        .iter()
        .map(|branch| branch.title().to_owned())
        .collect();
    ensure!(titles == ["Build", "Design"], "unexpected order {titles:?}");
    ensure!(
        phone.workspace.hierarchy.effective_responsible(design.id())? == Some(lead.id()),
        "responsibility replicated"
    );
    let tasks = phone
        .workspace
        .tasks
        .list_tasks(design.id(), TaskFilter::All)?;
    let replicated = tasks.first().ok_or_else(|| eyre!("task missing"))?;
    ensure!(replicated.completed(), "completion replicated");
    ensure!(
        phone
            .workspace
            .tasks
            .list_tasks(design.id(), TaskFilter::OpenOnly)?
            .is_empty(),
        "no open tasks"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pulled_records_match_the_pushed_ones(remote: InMemoryRemoteStore) -> Result<()> {
    let source = replica(&remote)?;
    let mirror = replica(&remote)?;
    let project = source.workspace.hierarchy.create_project("Atlas")?;
    let branch = source
        .workspace
        .hierarchy
        .add_branch(project.root_branch_id(), Some("Design"))?;
    source.engine.run_cycle().await?;
    source.workspace.hierarchy.update_branch(
        branch.id(),
        BranchPatch {
            description: Some("Wireframes and flows".to_owned()),
            ..BranchPatch::default()
        },
    )?;
    source.engine.run_cycle().await?;

    mirror.engine.run_cycle().await?;

    let pushed = source
        .store
        .branch(branch.id())?
        .ok_or_else(|| eyre!("source branch missing"))?;
    let pulled = mirror
        .store
        .branch(branch.id())?
        .ok_or_else(|| eyre!("mirror branch missing"))?;
    ensure!(pushed.meta().version() == 2, "one push after create");
    ensure!(pulled == pushed, "mirror copy differs: {pulled:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn losing_replica_is_told_and_converges(remote: InMemoryRemoteStore) -> Result<()> {
    let first = replica(&remote)?;
    let second = replica(&remote)?;
    let project = first.workspace.hierarchy.create_project("Atlas")?;
    let branch = first
        .workspace
        .hierarchy
        .add_branch(project.root_branch_id(), Some("X"))?;
    for title in ["X v2", "X v3"] {
        first.engine.run_cycle().await?;
        first.workspace.hierarchy.update_branch(
            branch.id(),
            BranchPatch {
                title: Some(title.to_owned()),
                ..BranchPatch::default()
            },
        )?;
    }
    first.engine.run_cycle().await?;
    second.engine.run_cycle().await?;
    let mut notices = second.engine.subscribe_notices();

    for (device, title) in [(&first, "First wins"), (&second, "Second loses")] {
        device.workspace.hierarchy.update_branch(
            branch.id(),
            BranchPatch {
                title: Some(title.to_owned()),
                ..BranchPatch::default()
            },
        )?;
    }
    first.engine.run_cycle().await?;
    let report = second.engine.run_cycle().await?;

    ensure!(report.drain.conflicted == 1, "expected one conflict");
    let notice = notices.try_recv()?;
    ensure!(
        notice.reason == DiscardReason::VersionConflict,
        "unexpected notice {notice}"
    );
    let settled = second.workspace.hierarchy.branch(branch.id())?;
    ensure!(settled.title() == "First wins", "remote copy should win");
    ensure!(settled.meta().version() == 4, "converged on version 4");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn queue_survives_reopening_the_database(remote: InMemoryRemoteStore) -> Result<()> {
    let path = std::env::temp_dir().join(format!("canopy-{}.db", Uuid::new_v4()));
    let path_str = path
        .to_str()
        .ok_or_else(|| eyre!("temp path is not UTF-8"))?
        .to_owned();

    let queued = {
        remote.set_offline(true);
        let before = replica_on(SqliteLocalStore::open(&path_str)?, &remote);
        before.workspace.hierarchy.create_project("Atlas")?;
        before.engine.run_cycle().await?;
        before.engine.pending_entity_ids()?
    };
    ensure!(queued.len() == 2, "project and root queued");

    remote.set_offline(false);
    let after = replica_on(SqliteLocalStore::open(&path_str)?, &remote);
    ensure!(
        after.engine.pending_entity_ids()? == queued,
        "queue reloaded from disk"
    );
    let report = after.engine.run_cycle().await?;
    ensure!(report.drain.acked == 2, "reloaded operations pushed");
    ensure!(after.engine.pending_entity_ids()?.is_empty(), "queue drained");

    drop(after);
    for suffix in ["", "-wal", "-shm"] {
        let leftover = format!("{path_str}{suffix}");
        if std::path::Path::new(&leftover).exists() {
            std::fs::remove_file(&leftover)?;
        }
    }
    Ok(())
}
