//! Branch aggregate: a node of the work-hierarchy DAG.

use super::{
    BranchId, ParseBranchKindError, ParseBranchStatusError, PersonId, ProjectId, RecordMeta,
    WorkspaceDomainError,
};
use chrono::{Datelike, NaiveDate};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title given to branches created without an explicit title.
pub const DEFAULT_BRANCH_TITLE: &str = "New branch";

/// Progress status of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    /// Work is scheduled but not started.
    #[default]
    Planned,
    /// Work is in progress.
    Active,
    /// Work is paused.
    Standby,
    /// Work is finished.
    Closed,
    /// Work was abandoned.
    Cancelled,
}

impl BranchStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Standby => "standby",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BranchStatus {
    type Error = ParseBranchStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "planned" => Ok(Self::Planned),
            "active" => Ok(Self::Active),
            "standby" => Ok(Self::Standby),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseBranchStatusError(value.to_owned())),
        }
    }
}

/// Semantic kind of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// Ordinary work branch.
    #[default]
    Standard,
    /// Grouping label.
    Label,
    /// Time-boxed iteration; children receive sequenced titles.
    Sprint,
    /// Goal or outcome.
    Objective,
}

impl BranchKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Label => "label",
            Self::Sprint => "sprint",
            Self::Objective => "objective",
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BranchKind {
    type Error = ParseBranchKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "standard" => Ok(Self::Standard),
            "label" => Ok(Self::Label),
            "sprint" => Ok(Self::Sprint),
            "objective" => Ok(Self::Objective),
            _ => Err(ParseBranchKindError(value.to_owned())),
        }
    }
}

/// Partial update applied by [`Branch::apply`].
///
/// `None` leaves a field untouched. Nested options clear a field when set to
/// `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<BranchStatus>,
    /// New kind.
    pub kind: Option<BranchKind>,
    /// New colour tag.
    pub color: Option<Option<String>>,
    /// New explicit responsible person.
    pub responsible_id: Option<Option<PersonId>>,
    /// New start date.
    pub start_date: Option<Option<NaiveDate>>,
    /// New due date.
    pub due_date: Option<Option<NaiveDate>>,
    /// New end date.
    pub end_date: Option<Option<NaiveDate>>,
    /// New UI collapse flag.
    pub collapsed: Option<bool>,
}

/// A node in the work hierarchy.
///
/// Only the upward edges (`parent_ids`) are stored. Children are found by
/// reverse lookup in the local store, so the two directions of an edge can
/// never diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    id: BranchId,
    project_id: ProjectId,
    title: String,
    description: String,
    status: BranchStatus,
    kind: BranchKind,
    color: Option<String>,
    responsible_id: Option<PersonId>,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    parent_ids: Vec<BranchId>,
    position: i64,
    archived: bool,
    collapsed: bool,
    sprint_counter: u32,
    #[serde(flatten)]
    meta: RecordMeta,
}

impl Branch {
    /// Creates the root branch of a project.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyBranchTitle`] when the title is
    /// blank.
    pub fn new_root(
        id: BranchId,
        project_id: ProjectId,
        title: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<Self, WorkspaceDomainError> {
        Ok(Self::build(
            id,
            project_id,
            normalize_title(title.into())?,
            Vec::new(),
            0,
            clock,
        ))
    }

    /// Creates a branch under a single parent.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyBranchTitle`] when the title is
    /// blank.
    pub fn new_child(
        parent: &Self,
        title: impl Into<String>,
        position: i64,
        clock: &impl Clock,
    ) -> Result<Self, WorkspaceDomainError> {
        Ok(Self::build(
            BranchId::new(),
            parent.project_id,
            normalize_title(title.into())?,
            vec![parent.id],
            position,
            clock,
        ))
    }

    fn build(
        id: BranchId,
        project_id: ProjectId,
        title: String,
        parent_ids: Vec<BranchId>,
        position: i64,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            project_id,
            title,
            description: String::new(),
            status: BranchStatus::default(),
            kind: BranchKind::default(),
            color: None,
            responsible_id: None,
            start_date: None,
            due_date: None,
            end_date: None,
            parent_ids,
            position,
            archived: false,
            collapsed: false,
            sprint_counter: 0,
            meta: RecordMeta::new(clock),
        }
    }

    /// Returns the branch identifier.
    #[must_use]
    pub const fn id(&self) -> BranchId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the progress status.
    #[must_use]
    pub const fn status(&self) -> BranchStatus {
        self.status
    }

    /// Returns the branch kind.
    #[must_use]
    pub const fn kind(&self) -> BranchKind {
        self.kind
    }

    /// Returns the colour tag, if any.
    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Returns the explicitly assigned responsible person, if any.
    #[must_use]
    pub const fn responsible_id(&self) -> Option<PersonId> {
        self.responsible_id
    }

    /// Returns the start date.
    #[must_use]
    pub const fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    /// Returns the due date.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Returns the end date.
    #[must_use]
    pub const fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Returns the parent identifiers in link order.
    #[must_use]
    pub fn parent_ids(&self) -> &[BranchId] {
        &self.parent_ids
    }

    /// Returns the sibling ordering key.
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    /// Returns whether the branch is archived.
    #[must_use]
    pub const fn archived(&self) -> bool {
        self.archived
    }

    /// Returns the UI collapse flag.
    #[must_use]
    pub const fn collapsed(&self) -> bool {
        self.collapsed
    }

    /// Returns how many sprint children have been sequenced so far.
    #[must_use]
    pub const fn sprint_counter(&self) -> u32 {
        self.sprint_counter
    }

    /// Returns replication metadata.
    #[must_use]
    pub const fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    /// Returns `true` when the branch has no parents.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Returns `true` when `parent_id` is one of the parents.
    #[must_use]
    pub fn has_parent(&self, parent_id: BranchId) -> bool {
        self.parent_ids.contains(&parent_id)
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::EmptyBranchTitle`] when the patch
    /// supplies a blank title. The branch is left untouched in that case.
    pub fn apply(
        &mut self,
        patch: BranchPatch,
        clock: &impl Clock,
    ) -> Result<(), WorkspaceDomainError> {
        let title = patch.title.map(normalize_title).transpose()?;
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(responsible_id) = patch.responsible_id {
            self.responsible_id = responsible_id;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(collapsed) = patch.collapsed {
            self.collapsed = collapsed;
        }
        self.meta.touch(clock);
        Ok(())
    }

    /// Advances the sprint counter and returns the title for the next child.
    ///
    /// Titles follow `"{title} {YY}-{counter}"` using the clock's year.
    pub fn next_sprint_title(&mut self, clock: &impl Clock) -> String {
        self.sprint_counter = self.sprint_counter.saturating_add(1);
        self.meta.touch(clock);
        let year = clock.utc().year().rem_euclid(100);
        format!("{} {year:02}-{}", self.title, self.sprint_counter)
    }

    /// Adds a parent edge. Returns `false` when the edge already exists.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::SelfParent`] when linking a branch
    /// under itself.
    pub fn add_parent(
        &mut self,
        parent_id: BranchId,
        clock: &impl Clock,
    ) -> Result<bool, WorkspaceDomainError> {
        if parent_id == self.id {
            return Err(WorkspaceDomainError::SelfParent(self.id));
        }
        if self.has_parent(parent_id) {
            return Ok(false);
        }
        self.parent_ids.push(parent_id);
        self.meta.touch(clock);
        Ok(true)
    }

    /// Removes a parent edge. Returns `false` when the edge did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::LastParent`] when the edge is the only
    /// remaining parent.
    pub fn remove_parent(
        &mut self,
        parent_id: BranchId,
        clock: &impl Clock,
    ) -> Result<bool, WorkspaceDomainError> {
        if !self.has_parent(parent_id) {
            return Ok(false);
        }
        if self.parent_ids.len() == 1 {
            return Err(WorkspaceDomainError::LastParent(self.id));
        }
        self.parent_ids.retain(|id| *id != parent_id);
        self.meta.touch(clock);
        Ok(true)
    }

    /// Sets the sibling ordering key.
    pub fn set_position(&mut self, position: i64, clock: &impl Clock) {
        self.position = position;
        self.meta.touch(clock);
    }

    /// Flips the archived flag. Descendants are not affected.
    pub fn toggle_archived(&mut self, clock: &impl Clock) {
        self.archived = !self.archived;
        self.meta.touch(clock);
    }

    /// Marks the branch as soft-deleted.
    pub fn tombstone(&mut self, clock: &impl Clock) {
        self.meta.tombstone(clock);
    }

    pub(crate) const fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

fn normalize_title(title: String) -> Result<String, WorkspaceDomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(WorkspaceDomainError::EmptyBranchTitle);
    }
    Ok(trimmed.to_owned())
}
