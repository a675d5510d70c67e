//! Person entity attached to a project.

use super::{PersonId, ProjectId, RecordMeta, WorkspaceDomainError};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Colour tags handed out to people in creation order.
pub const PERSON_PALETTE: [&str; 8] = [
    "blue", "green", "orange", "purple", "teal", "red", "yellow", "grey",
];

/// Partial update applied by [`Person::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    /// New display name. Initials are re-derived.
    pub name: Option<String>,
    /// New email address.
    pub email: Option<Option<String>>,
    /// New phone number.
    pub phone: Option<Option<String>>,
    /// New colour tag.
    pub color: Option<String>,
}

/// Someone who can be responsible for branches or assigned to tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    id: PersonId,
    project_id: ProjectId,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    initials: String,
    color: String,
    #[serde(flatten)]
    meta: RecordMeta,
}

impl Person {
    /// Creates a person. `ordinal` selects the colour tag from
    /// [`PERSON_PALETTE`], wrapping around.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyPersonName`] when the name is
    /// blank.
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        ordinal: usize,
        clock: &impl Clock,
    ) -> Result<Self, WorkspaceDomainError> {
        let name = normalize_name(name.into())?;
        Ok(Self {
            id: PersonId::new(),
            project_id,
            initials: initials_of(&name),
            name,
            email: None,
            phone: None,
            color: palette_color(ordinal).to_owned(),
            meta: RecordMeta::new(clock),
        })
    }

    /// Returns the person identifier.
    #[must_use]
    pub const fn id(&self) -> PersonId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the email address, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the phone number, if any.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Returns the derived initials.
    #[must_use]
    pub fn initials(&self) -> &str {
        &self.initials
    }

    /// Returns the colour tag.
    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Returns replication metadata.
    #[must_use]
    pub const fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyPersonName`] when the patch
    /// supplies a blank name.
    pub fn apply(
        &mut self,
        patch: PersonPatch,
        clock: &impl Clock,
    ) -> Result<(), WorkspaceDomainError> {
        if let Some(name) = patch.name {
            let name = normalize_name(name)?;
            self.initials = initials_of(&name);
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        self.meta.touch(clock);
        Ok(())
    }

    /// Marks the person as soft-deleted.
    pub fn tombstone(&mut self, clock: &impl Clock) {
        self.meta.tombstone(clock);
    }

    pub(crate) const fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

/// Derives upper-case initials from the first two words of a name.
#[must_use]
pub fn initials_of(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

fn palette_color(ordinal: usize) -> &'static str {
    ordinal
        .checked_rem(PERSON_PALETTE.len())
        .and_then(|index| PERSON_PALETTE.get(index))
        .copied()
        .unwrap_or("grey")
}

fn normalize_name(name: String) -> Result<String, WorkspaceDomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(WorkspaceDomainError::EmptyPersonName);
    }
    Ok(trimmed.to_owned())
}
