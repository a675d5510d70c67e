//! Upserts, version-checked updates, and version-checked soft deletes.

use super::cluster::{PostgresCluster, postgres_cluster};
use super::helpers::{FixedClock, clock, normalized, record_of, remote_db};
use canopy::sync::ports::{RemoteStore, WriteOutcome};
use canopy::workspace::domain::{
    Branch, BranchId, BranchPatch, Entity, EntityKind, Person, PersonPatch, Project, Task,
};
use chrono::{NaiveDate, TimeDelta};
use eyre::{Result, bail, ensure};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn upsert_inserts_at_version_one_then_replaces(
    postgres_cluster: Option<PostgresCluster>,
    clock: FixedClock,
) -> Result<()> {
    let Some(cluster) = postgres_cluster else {
        return Ok(());
    };
    let db = remote_db(cluster).await?;
    let project = Project::new("Atlas", BranchId::new(), &clock)?;
    let mut person = Person::new(project.id(), "Ada Lovelace", 0, &clock)?;

    ensure!(
        db.store.upsert(&record_of(person.clone())?).await? == 1,
        "insert starts at version 1"
    );
    person.apply(
        PersonPatch {
            email: Some(Some("ada@example.org".to_owned())),
            ..PersonPatch::default()
        },
        &clock,
    )?;
    ensure!(
        db.store.upsert(&record_of(person.clone())?).await? == 2,
        "replace bumps the version"
    );

    let pulled = db.store.pull(EntityKind::Person, 0).await?;
    let [row] = pulled.as_slice() else {
        bail!("expected one person, pulled {}", pulled.len());
    };
    let expected = record_of(person)?.with_version(2);
    ensure!(
        normalized(row.record.clone())? == expected,
        "pulled {:?}",
        row.record
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conditional_update_applies_only_at_the_expected_version(
    postgres_cluster: Option<PostgresCluster>,
    clock: FixedClock,
) -> Result<()> {
    let Some(cluster) = postgres_cluster else {
        return Ok(());
    };
    let db = remote_db(cluster).await?;
    let root_id = BranchId::new();
    let project = Project::new("Atlas", root_id, &clock)?;
    let root = Branch::new_root(root_id, project.id(), "Atlas", &clock)?;
    let mut design = Branch::new_child(&root, "Design", 0, &clock)?;
    db.store.upsert(&record_of(design.clone())?).await?;
    design.apply(
        BranchPatch {
            title: Some("Build".to_owned()),
            due_date: Some(NaiveDate::from_ymd_opt(2025, 4, 1)),
            ..BranchPatch::default()
        },
        &clock,
    )?;
    let update = record_of(design)?;

    let applied = db.store.update_if_version(&update, 1).await?;
    ensure!(
        applied == WriteOutcome::Applied { version: 2 },
        "first update {applied:?}"
    );
    let replayed = db.store.update_if_version(&update, 1).await?;
    ensure!(replayed == WriteOutcome::Stale, "replay {replayed:?}");
    let ghost = record_of(Branch::new_child(&root, "Ghost", 1, &clock)?)?;
    let missing = db.store.update_if_version(&ghost, 1).await?;
    ensure!(missing == WriteOutcome::Stale, "unknown row {missing:?}");

    let pulled = db.store.pull(EntityKind::Branch, 0).await?;
    let [row] = pulled.as_slice() else {
        bail!("expected one branch, pulled {}", pulled.len());
    };
    ensure!(
        normalized(row.record.clone())? == update.with_version(2),
        "pulled {:?}",
        row.record
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conditional_soft_delete_leaves_a_tombstone(
    postgres_cluster: Option<PostgresCluster>,
    clock: FixedClock,
) -> Result<()> {
    let Some(cluster) = postgres_cluster else {
        return Ok(());
    };
    let db = remote_db(cluster).await?;
    let task = Task::new(BranchId::new(), "Sketch", 0, &clock)?;
    let id = task.id().into_inner();
    db.store.upsert(&record_of(task)?).await?;
    let deleted_at = clock.0 + TimeDelta::hours(1);

    let early = db
        .store
        .soft_delete_if_version(EntityKind::Task, id, 3, deleted_at)
        .await?;
    ensure!(early == WriteOutcome::Stale, "wrong version {early:?}");
    let applied = db
        .store
        .soft_delete_if_version(EntityKind::Task, id, 1, deleted_at)
        .await?;
    ensure!(
        applied == WriteOutcome::Applied { version: 2 },
        "delete {applied:?}"
    );
    let replayed = db
        .store
        .soft_delete_if_version(EntityKind::Task, id, 1, deleted_at)
        .await?;
    ensure!(replayed == WriteOutcome::Stale, "replay {replayed:?}");

    let pulled = db.store.pull(EntityKind::Task, 0).await?;
    let [row] = pulled.as_slice() else {
        bail!("expected the tombstone, pulled {}", pulled.len());
    };
    let Entity::Task(tombstone) = row.record.clone().into_entity()? else {
        bail!("pulled a non-task row");
    };
    ensure!(tombstone.meta().version() == 2, "version {}", tombstone.meta().version());
    ensure!(
        tombstone.meta().deleted_at() == Some(deleted_at),
        "deleted_at {:?}",
        tombstone.meta().deleted_at()
    );
    ensure!(
        tombstone.meta().updated_at() == deleted_at,
        "updated_at follows the deletion"
    );
    Ok(())
}
