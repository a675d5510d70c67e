//! Revision cursors, tombstones in pulls, and writers still in flight.

use super::cluster::{PostgresCluster, postgres_cluster};
use super::helpers::{FixedClock, clock, record_of, remote_db};
use canopy::sync::{domain::PulledRecord, ports::RemoteStore};
use canopy::workspace::domain::{BranchId, EntityKind, Project};
use diesel::connection::SimpleConnection;
use eyre::{Result, bail, ensure};
use rstest::rstest;
use uuid::Uuid;

fn ids(rows: &[PulledRecord]) -> Vec<Option<Uuid>> {
    rows.iter().map(|row| row.record.id()).collect()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pulls_resume_after_the_cursor_and_carry_tombstones(
    postgres_cluster: Option<PostgresCluster>,
    clock: FixedClock,
) -> Result<()> {
    let Some(cluster) = postgres_cluster else {
        return Ok(());
    };
    let db = remote_db(cluster).await?;
    db.store.ensure_schema().await?;
    let atlas = Project::new("Atlas", BranchId::new(), &clock)?;
    let zenith = Project::new("Zenith", BranchId::new(), &clock)?;
    db.store.upsert(&record_of(atlas.clone())?).await?;
    db.store.upsert(&record_of(zenith.clone())?).await?;

    let first = db.store.pull(EntityKind::Project, 0).await?;
    ensure!(
        ids(&first) == [Some(atlas.id().into_inner()), Some(zenith.id().into_inner())],
        "first pull {:?}",
        ids(&first)
    );
    ensure!(
        first
            .iter()
            .all(|row| !row.record.fields().contains_key("revision")),
        "revision must not travel as a column"
    );
    let Some(cursor) = first.last().map(|row| row.revision) else {
        bail!("empty first pull");
    };
    ensure!(
        first.first().map(|row| row.revision) < Some(cursor),
        "separate writes get increasing revisions"
    );
    ensure!(
        db.store.pull(EntityKind::Project, cursor).await?.is_empty(),
        "nothing new after the cursor"
    );

    db.store
        .soft_delete_if_version(EntityKind::Project, atlas.id().into_inner(), 1, clock.0)
        .await?;
    let second = db.store.pull(EntityKind::Project, cursor).await?;
    let [row] = second.as_slice() else {
        bail!("expected the tombstone alone, pulled {}", second.len());
    };
    ensure!(row.record.id() == Some(atlas.id().into_inner()), "wrong row");
    ensure!(row.record.deleted_at() == Some(clock.0), "tombstone missing");
    ensure!(row.revision > cursor, "revision moved forward");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rows_committed_behind_a_running_writer_wait_for_it(
    postgres_cluster: Option<PostgresCluster>,
    clock: FixedClock,
) -> Result<()> {
    let Some(cluster) = postgres_cluster else {
        return Ok(());
    };
    let db = remote_db(cluster).await?;
    let early = Project::new("Early", BranchId::new(), &clock)?;
    let late = Project::new("Late", BranchId::new(), &clock)?;

    let mut writer = db.connect()?;
    writer.batch_execute(&format!(
        "BEGIN; \
         INSERT INTO projects (id, name, root_branch_id, updated_at) \
         VALUES ('{}', 'Early', '{}', now());",
        early.id().into_inner(),
        early.root_branch_id().into_inner(),
    ))?;
    db.store.upsert(&record_of(late.clone())?).await?;

    let held = db.store.pull(EntityKind::Project, 0).await?;
    ensure!(
        held.is_empty(),
        "a later commit must not overtake a running writer: {:?}",
        ids(&held)
    );

    writer.batch_execute("COMMIT;")?;
    let released = db.store.pull(EntityKind::Project, 0).await?;
    ensure!(
        ids(&released) == [Some(early.id().into_inner()), Some(late.id().into_inner())],
        "after commit {:?}",
        ids(&released)
    );
    Ok(())
}
