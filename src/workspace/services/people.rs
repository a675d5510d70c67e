//! Service layer for people attached to projects.

use std::sync::Arc;

use mockable::Clock;

use super::{WorkspaceResult, writer::WorkspaceWriter};
use crate::sync::{
    ports::{JournaledStore, OperationQueue},
    services::Outbox,
};
use crate::workspace::domain::{ChangeSet, Person, PersonId, PersonPatch, ProjectId};

/// Request payload for adding a person to a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPersonRequest {
    project_id: ProjectId,
    name: String,
    email: Option<String>,
    phone: Option<String>,
}

impl AddPersonRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            project_id,
            name: name.into(),
            email: None,
            phone: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Person orchestration service.
pub struct PersonService<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    writer: WorkspaceWriter<S, Q, C>,
}

impl<S, Q, C> Clone for PersonService<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

impl<S, Q, C> PersonService<S, Q, C>
where
    S: JournaledStore<Q>,
    Q: OperationQueue,
    C: Clock + Send + Sync,
{
    /// Creates a new person service.
    #[must_use]
    pub const fn new(store: Arc<S>, outbox: Outbox<Q>, clock: Arc<C>) -> Self {
        Self {
            writer: WorkspaceWriter::new(store, outbox, clock),
        }
    }

    /// Adds a person with derived initials and the next palette colour.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkspaceError::ProjectNotFound`] or
    /// [`super::WorkspaceError::Validation`] for a blank name.
    pub fn add_person(&self, request: AddPersonRequest) -> WorkspaceResult<Person> {
        let clock = &*self.writer.clock;
        self.writer.live_project(request.project_id)?;
        let ordinal = self.writer.store.person_count(request.project_id)?;
        let mut person = Person::new(request.project_id, request.name, ordinal, clock)?;
        if request.email.is_some() || request.phone.is_some() {
            person.apply(
                PersonPatch {
                    email: request.email.map(Some),
                    phone: request.phone.map(Some),
                    ..PersonPatch::default()
                },
                clock,
            )?;
        }
        self.writer.commit(&ChangeSet::new().with(person.clone()))?;
        Ok(person)
    }

    /// Patches a person.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkspaceError::PersonNotFound`] or
    /// [`super::WorkspaceError::Validation`].
    pub fn update_person(&self, id: PersonId, patch: PersonPatch) -> WorkspaceResult<Person> {
        let mut person = self.writer.live_person(id)?;
        person.apply(patch, &*self.writer.clock)?;
        self.writer.commit(&ChangeSet::new().with(person.clone()))?;
        Ok(person)
    }

    /// Tombstones a person. Branches and tasks referring to them keep the
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkspaceError::PersonNotFound`].
    pub fn delete_person(&self, id: PersonId) -> WorkspaceResult<()> {
        let mut person = self.writer.live_person(id)?;
        person.tombstone(&*self.writer.clock);
        self.writer.commit(&ChangeSet::new().with(person))
    }

    /// Lists live people of a project ordered by name.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn list_people(&self, project_id: ProjectId) -> WorkspaceResult<Vec<Person>> {
        Ok(self.writer.store.people_in_project(project_id)?)
    }
}
