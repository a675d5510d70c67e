//! SQL text for the remote store.
//!
//! Records travel as one `jsonb` parameter expanded with
//! `jsonb_populate_record`, so each statement only needs the table's column
//! list. Table and column names come from static lists, never from input.
//!
//! A row's revision is the id of the transaction that last wrote it. Pulls
//! only return rows below the snapshot's `xmin`: every transaction under that
//! bound has finished, so no row at or below a returned revision can become
//! visible afterwards and the client cursor never skips a late commit.

use crate::workspace::domain::EntityKind;

const REVISION: &str = "pg_current_xact_id()::text::bigint";

const VISIBLE_HORIZON: &str = "pg_snapshot_xmin(pg_current_snapshot())::text::bigint";

/// Writable columns other than `id`, `version`, and `revision`.
pub(super) const fn data_columns(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Project => &["name", "root_branch_id", "updated_at", "deleted_at"],
        EntityKind::Person => &[
            "project_id",
            "name",
            "email",
            "phone",
            "initials",
            "color",
            "updated_at",
            "deleted_at",
        ],
        EntityKind::Branch => &[
            "project_id",
            "title",
            "description",
            "status",
            "kind",
            "color",
            "responsible_id",
            "start_date",
            "due_date",
            "end_date",
            "parent_ids",
            "position",
            "archived",
            "collapsed",
            "sprint_counter",
            "updated_at",
            "deleted_at",
        ],
        EntityKind::Task => &[
            "branch_id",
            "title",
            "description",
            "assignee_id",
            "due_date",
            "completed",
            "completed_at",
            "pinned",
            "position",
            "updated_at",
            "deleted_at",
        ],
    }
}

/// Insert at version 1 or replace and bump the version. Binds: `$1` record.
pub(super) fn upsert(kind: EntityKind) -> String {
    let table = kind.table_name();
    let columns = data_columns(kind);
    let list = columns.join(", ");
    let assignments = columns
        .iter()
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} (id, {list}, version, revision) \
         SELECT id, {list}, 1, {REVISION} FROM jsonb_populate_record(NULL::{table}, $1::jsonb) \
         ON CONFLICT (id) DO UPDATE SET {assignments}, \
         version = {table}.version + 1, revision = EXCLUDED.revision \
         RETURNING version"
    )
}

/// Replace when the version matches. Binds: `$1` record, `$2` id, `$3`
/// expected version.
pub(super) fn update_if_version(kind: EntityKind) -> String {
    let table = kind.table_name();
    let list = data_columns(kind).join(", ");
    format!(
        "UPDATE {table} SET ({list}) = \
         (SELECT {list} FROM jsonb_populate_record(NULL::{table}, $1::jsonb)), \
         version = version + 1, revision = {REVISION} \
         WHERE id = $2 AND version = $3 \
         RETURNING version"
    )
}

/// Tombstone when the version matches. Binds: `$1` id, `$2` expected
/// version, `$3` deletion time.
pub(super) fn soft_delete_if_version(kind: EntityKind) -> String {
    let table = kind.table_name();
    format!(
        "UPDATE {table} SET deleted_at = $3, updated_at = $3, \
         version = version + 1, revision = {REVISION} \
         WHERE id = $1 AND version = $2 \
         RETURNING version"
    )
}

/// Rows written after a revision by transactions older than every one still
/// running. Binds: `$1` revision.
pub(super) fn pull(kind: EntityKind) -> String {
    let table = kind.table_name();
    format!(
        "SELECT to_jsonb(t) - 'revision' AS payload, t.revision AS revision \
         FROM {table} t WHERE t.revision > $1 AND t.revision < {VISIBLE_HORIZON} \
         ORDER BY t.revision, t.id"
    )
}
