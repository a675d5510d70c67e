//! Remote table definitions.

/// DDL for the remote tables.
///
/// Every table carries `version` for optimistic checks and `revision`, the
/// id of the last writing transaction, as the pull cursor. Statements are
/// idempotent. Requires `PostgreSQL` 13 or later.
pub const REMOTE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS projects (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    root_branch_id UUID NOT NULL,
    version BIGINT NOT NULL DEFAULT 1,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ,
    revision BIGINT NOT NULL DEFAULT (pg_current_xact_id()::text::bigint)
);

CREATE TABLE IF NOT EXISTS people (
    id UUID PRIMARY KEY,
    project_id UUID NOT NULL,
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    initials TEXT NOT NULL,
    color TEXT NOT NULL,
    version BIGINT NOT NULL DEFAULT 1,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ,
    revision BIGINT NOT NULL DEFAULT (pg_current_xact_id()::text::bigint)
);

CREATE TABLE IF NOT EXISTS branches (
    id UUID PRIMARY KEY,
    project_id UUID NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    kind TEXT NOT NULL,
    color TEXT,
    responsible_id UUID,
    start_date DATE,
    due_date DATE,
    end_date DATE,
    parent_ids UUID[] NOT NULL DEFAULT '{}',
    position BIGINT NOT NULL,
    archived BOOLEAN NOT NULL DEFAULT FALSE,
    collapsed BOOLEAN NOT NULL DEFAULT FALSE,
    sprint_counter INTEGER NOT NULL DEFAULT 0,
    version BIGINT NOT NULL DEFAULT 1,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ,
    revision BIGINT NOT NULL DEFAULT (pg_current_xact_id()::text::bigint)
);

CREATE TABLE IF NOT EXISTS tasks (
    id UUID PRIMARY KEY,
    branch_id UUID NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    assignee_id UUID,
    due_date DATE,
    completed BOOLEAN NOT NULL DEFAULT FALSE,
    completed_at TIMESTAMPTZ,
    pinned BOOLEAN NOT NULL DEFAULT FALSE,
    position BIGINT NOT NULL,
    version BIGINT NOT NULL DEFAULT 1,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ,
    revision BIGINT NOT NULL DEFAULT (pg_current_xact_id()::text::bigint)
);

CREATE INDEX IF NOT EXISTS idx_projects_revision ON projects (revision);
CREATE INDEX IF NOT EXISTS idx_people_revision ON people (revision);
CREATE INDEX IF NOT EXISTS idx_branches_revision ON branches (revision);
CREATE INDEX IF NOT EXISTS idx_tasks_revision ON tasks (revision);
";
