//! Type-erased view over the synchronized entity kinds.

use super::{Branch, Person, Project, RecordMeta, Task};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The kinds of record held by the local and remote stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// [`Project`] records.
    Project,
    /// [`Branch`] records.
    Branch,
    /// [`Task`] records.
    Task,
    /// [`Person`] records.
    Person,
}

impl EntityKind {
    /// Every entity kind, in dependency order.
    pub const ALL: [Self; 4] = [Self::Project, Self::Person, Self::Branch, Self::Task];

    /// Returns the table name used by both stores.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Branch => "branches",
            Self::Task => "tasks",
            Self::Person => "people",
        }
    }

    /// Resolves a table name back to its kind.
    #[must_use]
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table_name() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Any synchronized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// A project.
    Project(Project),
    /// A branch.
    Branch(Branch),
    /// A task.
    Task(Task),
    /// A person.
    Person(Person),
}

impl Entity {
    /// Returns the entity kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Project(_) => EntityKind::Project,
            Self::Branch(_) => EntityKind::Branch,
            Self::Task(_) => EntityKind::Task,
            Self::Person(_) => EntityKind::Person,
        }
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Project(project) => project.id().into_inner(),
            Self::Branch(branch) => branch.id().into_inner(),
            Self::Task(task) => task.id().into_inner(),
            Self::Person(person) => person.id().into_inner(),
        }
    }

    /// Returns replication metadata.
    #[must_use]
    pub const fn meta(&self) -> &RecordMeta {
        match self {
            Self::Project(project) => project.meta(),
            Self::Branch(branch) => branch.meta(),
            Self::Task(task) => task.meta(),
            Self::Person(person) => person.meta(),
        }
    }

    pub(crate) const fn meta_mut(&mut self) -> &mut RecordMeta {
        match self {
            Self::Project(project) => project.meta_mut(),
            Self::Branch(branch) => branch.meta_mut(),
            Self::Task(task) => task.meta_mut(),
            Self::Person(person) => person.meta_mut(),
        }
    }

    /// Serializes the record into its flat, snake-case remote shape.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if a field cannot be encoded.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Project(project) => serde_json::to_value(project),
            Self::Branch(branch) => serde_json::to_value(branch),
            Self::Task(task) => serde_json::to_value(task),
            Self::Person(person) => serde_json::to_value(person),
        }
    }

    /// Decodes a flat record of the given kind.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error when the payload does not match the
    /// kind's shape.
    pub fn from_json(kind: EntityKind, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EntityKind::Project => Self::Project(serde_json::from_value(value)?),
            EntityKind::Branch => Self::Branch(serde_json::from_value(value)?),
            EntityKind::Task => Self::Task(serde_json::from_value(value)?),
            EntityKind::Person => Self::Person(serde_json::from_value(value)?),
        })
    }
}

impl From<Project> for Entity {
    fn from(project: Project) -> Self {
        Self::Project(project)
    }
}

impl From<Branch> for Entity {
    fn from(branch: Branch) -> Self {
        Self::Branch(branch)
    }
}

impl From<Task> for Entity {
    fn from(task: Task) -> Self {
        Self::Task(task)
    }
}

impl From<Person> for Entity {
    fn from(person: Person) -> Self {
        Self::Person(person)
    }
}

/// Records written to the local store as one atomic unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entities: Vec<Entity>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }

    /// Adds a record, returning the updated set.
    #[must_use]
    pub fn with(mut self, entity: impl Into<Entity>) -> Self {
        self.push(entity);
        self
    }

    /// Adds a record.
    pub fn push(&mut self, entity: impl Into<Entity>) {
        self.entities.push(entity.into());
    }

    /// Returns the records in insertion order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns `true` when the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}
