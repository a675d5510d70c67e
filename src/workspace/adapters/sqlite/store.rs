//! [`LocalStore`] over the `SQLite` entity tables.

use rusqlite::{Connection, OptionalExtension, Params, Transaction, params};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::SqliteLocalStore;
use crate::workspace::{
    domain::{
        Branch, BranchId, ChangeSet, Entity, EntityKind, Person, PersonId, Project, ProjectId,
        Task, TaskId,
    },
    ports::{
        LocalStore, LocalStoreError, LocalStoreResult, TaskFilter, sort_people, sort_siblings,
        sort_tasks,
    },
};

impl SqliteLocalStore {
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> LocalStoreResult<T>,
    ) -> LocalStoreResult<T> {
        let conn = self.lock().map_err(LocalStoreError::persistence)?;
        f(&conn)
    }
}

fn decode<T: DeserializeOwned>(kind: EntityKind, id: &str, body: &str) -> LocalStoreResult<T> {
    serde_json::from_str(body).map_err(|err| LocalStoreError::Corrupt {
        kind,
        id: Uuid::parse_str(id).unwrap_or_default(),
        message: err.to_string(),
    })
}

fn find_one<T: DeserializeOwned>(
    conn: &Connection,
    kind: EntityKind,
    id: Uuid,
) -> LocalStoreResult<Option<T>> {
    let sql = format!("SELECT body FROM {} WHERE id = ?1", kind.table_name());
    let key = id.to_string();
    let body: Option<String> = conn
        .query_row(&sql, params![key], |row| row.get(0))
        .optional()
        .map_err(LocalStoreError::persistence)?;
    body.map(|json| decode(kind, &key, &json)).transpose()
}

fn load_all<T: DeserializeOwned>(
    conn: &Connection,
    kind: EntityKind,
    sql: &str,
    params: impl Params,
) -> LocalStoreResult<Vec<T>> {
    let mut statement = conn.prepare(sql).map_err(LocalStoreError::persistence)?;
    let rows = statement
        .query_map(params, |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(LocalStoreError::persistence)?;
    let mut records = Vec::new();
    for row in rows {
        let (id, body) = row.map_err(LocalStoreError::persistence)?;
        records.push(decode(kind, &id, &body)?);
    }
    Ok(records)
}

fn deleted_at_text(entity: &Entity) -> Option<String> {
    entity.meta().deleted_at().map(|at| at.to_rfc3339())
}

pub(super) fn write_entity(tx: &Transaction<'_>, entity: &Entity) -> LocalStoreResult<()> {
    let body = entity
        .to_json()
        .map_err(|err| LocalStoreError::Corrupt {
            kind: entity.kind(),
            id: entity.id(),
            message: err.to_string(),
        })?
        .to_string();
    let id = entity.id().to_string();
    let deleted_at = deleted_at_text(entity);

    let result = match entity {
        Entity::Project(project) => tx.execute(
            "INSERT OR REPLACE INTO projects (id, name, deleted_at, body) VALUES (?1, ?2, ?3, ?4)",
            params![id, project.name(), deleted_at, body],
        ),
        Entity::Branch(branch) => write_branch(tx, branch, &id, deleted_at, &body),
        Entity::Task(task) => tx.execute(
            "INSERT OR REPLACE INTO tasks (id, branch_id, completed, deleted_at, body) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                task.branch_id().to_string(),
                task.completed(),
                deleted_at,
                body
            ],
        ),
        Entity::Person(person) => tx.execute(
            "INSERT OR REPLACE INTO people (id, project_id, deleted_at, body) \
             VALUES (?1, ?2, ?3, ?4)",
            params![id, person.project_id().to_string(), deleted_at, body],
        ),
    };
    result.map_err(LocalStoreError::persistence)?;
    Ok(())
}

fn write_branch(
    tx: &Transaction<'_>,
    branch: &Branch,
    id: &str,
    deleted_at: Option<String>,
    body: &str,
) -> rusqlite::Result<usize> {
    let written = tx.execute(
        "INSERT OR REPLACE INTO branches (id, project_id, deleted_at, body) \
         VALUES (?1, ?2, ?3, ?4)",
        params![id, branch.project_id().to_string(), deleted_at, body],
    )?;
    tx.execute("DELETE FROM branch_parents WHERE child_id = ?1", params![id])?;
    for (index, parent_id) in branch.parent_ids().iter().enumerate() {
        let ordinal = i64::try_from(index)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
        tx.execute(
            "INSERT INTO branch_parents (child_id, parent_id, ordinal) VALUES (?1, ?2, ?3)",
            params![id, parent_id.to_string(), ordinal],
        )?;
    }
    Ok(written)
}

impl LocalStore for SqliteLocalStore {
    fn project(&self, id: ProjectId) -> LocalStoreResult<Option<Project>> {
        self.with_conn(|conn| find_one(conn, EntityKind::Project, id.into_inner()))
    }

    fn projects(&self) -> LocalStoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self.with_conn(|conn| {
            load_all(
                conn,
                EntityKind::Project,
                "SELECT id, body FROM projects WHERE deleted_at IS NULL",
                [],
            )
        })?;
        projects.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(&b.id())));
        Ok(projects)
    }

    fn branch(&self, id: BranchId) -> LocalStoreResult<Option<Branch>> {
        self.with_conn(|conn| find_one(conn, EntityKind::Branch, id.into_inner()))
    }

    fn branches_in_project(&self, project_id: ProjectId) -> LocalStoreResult<Vec<Branch>> {
        let mut branches: Vec<Branch> = self.with_conn(|conn| {
            load_all(
                conn,
                EntityKind::Branch,
                "SELECT id, body FROM branches WHERE project_id = ?1 AND deleted_at IS NULL",
                params![project_id.to_string()],
            )
        })?;
        sort_siblings(&mut branches);
        Ok(branches)
    }

    fn children_of(&self, parent_id: BranchId) -> LocalStoreResult<Vec<Branch>> {
        let mut children: Vec<Branch> = self.with_conn(|conn| {
            load_all(
                conn,
                EntityKind::Branch,
                "SELECT b.id, b.body FROM branch_parents p \
                 JOIN branches b ON b.id = p.child_id \
                 WHERE p.parent_id = ?1 AND b.deleted_at IS NULL",
                params![parent_id.to_string()],
            )
        })?;
        sort_siblings(&mut children);
        Ok(children)
    }

    fn task(&self, id: TaskId) -> LocalStoreResult<Option<Task>> {
        self.with_conn(|conn| find_one(conn, EntityKind::Task, id.into_inner()))
    }

    fn tasks_in_branch(
        &self,
        branch_id: BranchId,
        filter: TaskFilter,
    ) -> LocalStoreResult<Vec<Task>> {
        let sql = match filter {
            TaskFilter::All => {
                "SELECT id, body FROM tasks WHERE branch_id = ?1 AND deleted_at IS NULL"
            }
            TaskFilter::OpenOnly => {
                "SELECT id, body FROM tasks \
                 WHERE branch_id = ?1 AND deleted_at IS NULL AND completed = 0"
            }
        };
        let mut tasks: Vec<Task> = self.with_conn(|conn| {
            load_all(conn, EntityKind::Task, sql, params![branch_id.to_string()])
        })?;
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    fn person(&self, id: PersonId) -> LocalStoreResult<Option<Person>> {
        self.with_conn(|conn| find_one(conn, EntityKind::Person, id.into_inner()))
    }

    fn people_in_project(&self, project_id: ProjectId) -> LocalStoreResult<Vec<Person>> {
        let mut people: Vec<Person> = self.with_conn(|conn| {
            load_all(
                conn,
                EntityKind::Person,
                "SELECT id, body FROM people WHERE project_id = ?1 AND deleted_at IS NULL",
                params![project_id.to_string()],
            )
        })?;
        sort_people(&mut people);
        Ok(people)
    }

    fn person_count(&self, project_id: ProjectId) -> LocalStoreResult<usize> {
        let count: i64 = self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM people WHERE project_id = ?1",
                params![project_id.to_string()],
                |row| row.get(0),
            )
            .map_err(LocalStoreError::persistence)
        })?;
        usize::try_from(count).map_err(LocalStoreError::persistence)
    }

    fn commit(&self, changes: &ChangeSet) -> LocalStoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock().map_err(LocalStoreError::persistence)?;
        let tx = conn.transaction().map_err(LocalStoreError::persistence)?;
        for entity in changes.entities() {
            write_entity(&tx, entity)?;
        }
        tx.commit().map_err(LocalStoreError::persistence)
    }
}
