//! Create-edit divergence resolution.
//!
//! When one branch renumbers an issue during create resolution while
//! another branch edits it at its old id, the edited copy shows up as a
//! conflict at the old path. The edit has to be folded back into the
//! renumbered (authoritative) issue, field by field.

use std::fmt;
use std::path::PathBuf;

use crate::error::{IssueError, Result};
use crate::merge::conflict::{ConflictInfo, ConflictType, Stage};
use crate::merge::relocate::Placement;
use crate::model::{Actor, Issue, Status};
use crate::registry::Registry;
use crate::store::IssueStore;

/// A user-editable issue field. The creation date is never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueField {
    Summary,
    Description,
    Status,
    Assignee,
    Reporter,
    Subscribers,
    Attachments,
}

impl IssueField {
    pub const ALL: [Self; 7] = [
        Self::Summary,
        Self::Description,
        Self::Status,
        Self::Assignee,
        Self::Reporter,
        Self::Subscribers,
        Self::Attachments,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Status => "status",
            Self::Assignee => "assignee",
            Self::Reporter => "reporter",
            Self::Subscribers => "subscribers",
            Self::Attachments => "attachments",
        }
    }

    /// Read this field from an issue.
    #[must_use]
    pub fn get(self, issue: &Issue) -> FieldValue {
        match self {
            Self::Summary => FieldValue::Text(issue.summary.clone()),
            Self::Description => FieldValue::OptionalText(issue.description.clone()),
            Self::Status => FieldValue::Status(issue.status),
            Self::Assignee => FieldValue::Actor(issue.assignee.clone()),
            Self::Reporter => FieldValue::Actor(issue.reporter.clone()),
            Self::Subscribers => FieldValue::Actors(issue.subscribers.clone()),
            Self::Attachments => FieldValue::List(issue.attachments.clone()),
        }
    }

    /// Write `value` into this field of `issue`.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionAborted` if the value has the wrong shape.
    pub fn set(self, issue: &mut Issue, value: FieldValue) -> Result<()> {
        match (self, value) {
            (Self::Summary, FieldValue::Text(v)) => issue.summary = v,
            (Self::Description, FieldValue::OptionalText(v)) => issue.description = v,
            (Self::Status, FieldValue::Status(v)) => issue.status = v,
            (Self::Assignee, FieldValue::Actor(v)) => issue.assignee = v,
            (Self::Reporter, FieldValue::Actor(v)) => issue.reporter = v,
            (Self::Subscribers, FieldValue::Actors(v)) => issue.subscribers = v,
            (Self::Attachments, FieldValue::List(v)) => issue.attachments = v,
            (field, value) => {
                return Err(IssueError::ResolutionAborted {
                    field: field.as_str().to_string(),
                    reason: format!("value {value} has the wrong type"),
                });
            }
        }
        Ok(())
    }

    fn differs(self, a: &Issue, b: &Issue) -> bool {
        match self {
            Self::Subscribers => !a.same_subscribers(b),
            // Actor equality is keyed on email; a changed display name still counts.
            Self::Assignee => actor_differs(a.assignee.as_ref(), b.assignee.as_ref()),
            Self::Reporter => actor_differs(a.reporter.as_ref(), b.reporter.as_ref()),
            _ => self.get(a) != self.get(b),
        }
    }
}

fn actor_differs(a: Option<&Actor>, b: Option<&Actor>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a != b || a.name != b.name,
        (None, None) => false,
        _ => true,
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value of one [`IssueField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    OptionalText(Option<String>),
    Status(Status),
    Actor(Option<Actor>),
    Actors(Vec<Actor>),
    List(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => f.write_str(v),
            Self::OptionalText(Some(v)) => f.write_str(v),
            Self::OptionalText(None) | Self::Actor(None) => f.write_str("(none)"),
            Self::Status(v) => write!(f, "{v}"),
            Self::Actor(Some(v)) => write!(f, "{v}"),
            Self::Actors(v) => {
                let rendered: Vec<String> = v.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join(", "))
            }
            Self::List(v) => f.write_str(&v.join(", ")),
        }
    }
}

/// A field whose value differs between the authoritative and diverged issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: IssueField,
    /// Value on the renumbered issue.
    pub current: FieldValue,
    /// Value carried by the stale edit.
    pub incoming: FieldValue,
}

/// Every field where `incoming` differs from `current`.
#[must_use]
pub fn diff_fields(current: &Issue, incoming: &Issue) -> Vec<FieldDiff> {
    IssueField::ALL
        .into_iter()
        .filter(|field| field.differs(current, incoming))
        .map(|field| FieldDiff {
            field,
            current: field.get(current),
            incoming: field.get(incoming),
        })
        .collect()
}

/// Decides the final value of each differing field.
pub trait ResolutionPolicy {
    /// Choose the value to keep for `diff` on `issue`.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionAborted` if no value can be chosen.
    fn choose(&mut self, issue: &Issue, diff: &FieldDiff) -> Result<FieldValue>;
}

/// Keep the renumbered issue's values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferCurrent;

impl ResolutionPolicy for PreferCurrent {
    fn choose(&mut self, _issue: &Issue, diff: &FieldDiff) -> Result<FieldValue> {
        Ok(diff.current.clone())
    }
}

/// Take the stale edit's values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferIncoming;

impl ResolutionPolicy for PreferIncoming {
    fn choose(&mut self, _issue: &Issue, diff: &FieldDiff) -> Result<FieldValue> {
        Ok(diff.incoming.clone())
    }
}

impl<P: ResolutionPolicy + ?Sized> ResolutionPolicy for &mut P {
    fn choose(&mut self, issue: &Issue, diff: &FieldDiff) -> Result<FieldValue> {
        (**self).choose(issue, diff)
    }
}

impl<P: ResolutionPolicy + ?Sized> ResolutionPolicy for Box<P> {
    fn choose(&mut self, issue: &Issue, diff: &FieldDiff) -> Result<FieldValue> {
        (**self).choose(issue, diff)
    }
}

/// A divergence conflict matched to its authoritative issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergencePair {
    pub path: PathBuf,
    /// The stale edit made against the old id.
    pub diverged: Issue,
    /// The renumbered issue the edit belongs to.
    pub authoritative: Issue,
    /// The issue that now rightfully holds the conflicting id.
    pub kept: Issue,
    /// Stage the stale edit was read from.
    pub diverged_stage: Stage,
    /// Stage the kept issue was read from.
    pub kept_stage: Stage,
}

impl DivergencePair {
    #[must_use]
    pub fn diffs(&self) -> Vec<FieldDiff> {
        diff_fields(&self.authoritative, &self.diverged)
    }

    /// The edit follows its issue to the authoritative id; the kept issue
    /// stays put.
    #[must_use]
    pub fn placements(&self) -> [Placement; 2] {
        [
            Placement {
                uuid: self.diverged.uuid,
                from: self.diverged.id.clone(),
                to: self.authoritative.id.clone(),
                stage: Some(self.diverged_stage),
            },
            Placement {
                uuid: self.kept.uuid,
                from: self.kept.id.clone(),
                to: self.kept.id.clone(),
                stage: Some(self.kept_stage),
            },
        ]
    }
}

/// Find the authoritative issue for every divergence conflict.
///
/// Each stage (ours first) is looked up by uuid, first among `resolved`
/// issues from this merge's create resolution, then through the registry
/// and the store. A stage matches when its uuid now lives at a different
/// id.
///
/// # Errors
///
/// Returns `DivergenceMatchMissing` if neither stage matches.
pub fn match_divergences(
    conflicts: &[&ConflictInfo],
    resolved: &[Issue],
    registry: &Registry,
    store: &IssueStore,
) -> Result<Vec<DivergencePair>> {
    let mut pairs = Vec::new();
    for conflict in conflicts
        .iter()
        .filter(|c| c.kind == ConflictType::CreateEditDivergence)
    {
        let (Some(ours), Some(theirs)) = (conflict.issue(Stage::Ours), conflict.issue(Stage::Theirs))
        else {
            continue;
        };

        let mut matched = None;
        for (candidate, other) in [
            ((Stage::Ours, ours), (Stage::Theirs, theirs)),
            ((Stage::Theirs, theirs), (Stage::Ours, ours)),
        ] {
            if let Some(authoritative) = find_authoritative(candidate.1, resolved, registry, store)? {
                matched = Some((candidate, other, authoritative));
                break;
            }
        }

        let Some(((diverged_stage, diverged), (kept_stage, kept), authoritative)) = matched else {
            return Err(IssueError::DivergenceMatchMissing {
                ours_id: ours.id.to_string(),
                ours_uuid: ours.uuid,
                theirs_id: theirs.id.to_string(),
                theirs_uuid: theirs.uuid,
            });
        };
        tracing::debug!(
            path = %conflict.path.display(),
            from = %diverged.id,
            to = %authoritative.id,
            "matched diverged edit"
        );
        pairs.push(DivergencePair {
            path: conflict.path.clone(),
            diverged: diverged.clone(),
            authoritative,
            kept: kept.clone(),
            diverged_stage,
            kept_stage,
        });
    }
    Ok(pairs)
}

fn find_authoritative(
    candidate: &Issue,
    resolved: &[Issue],
    registry: &Registry,
    store: &IssueStore,
) -> Result<Option<Issue>> {
    if let Some(issue) = resolved
        .iter()
        .find(|i| i.uuid == candidate.uuid && i.id != candidate.id)
    {
        return Ok(Some(issue.clone()));
    }
    match registry.resolve(candidate.uuid) {
        Some(id) if *id != candidate.id => match store.get_by_uuid(registry, candidate.uuid) {
            Ok(found) => Ok(found),
            Err(IssueError::Decode { .. } | IssueError::UnexpectedDocument { .. }) => Ok(None),
            Err(e) => Err(e),
        },
        _ => Ok(None),
    }
}

/// Outcome of divergence resolution. Nothing is written until [`apply`].
///
/// [`apply`]: DivergenceResolution::apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceResolution {
    /// Issues restored at their conflicting ids.
    pub kept: Vec<Issue>,
    /// Authoritative issues with the chosen field values.
    pub merged: Vec<Issue>,
    /// Where the comments of every involved issue belong.
    pub placements: Vec<Placement>,
}

impl DivergenceResolution {
    /// Every issue this resolution writes.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.kept.iter().chain(&self.merged)
    }

    /// Write every kept and merged issue.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a document cannot be written.
    pub fn apply(&self, store: &IssueStore) -> Result<Vec<PathBuf>> {
        self.issues().map(|issue| store.write_issue(issue)).collect()
    }
}

/// Fold each diverged edit into its authoritative issue.
///
/// Fields that do not differ are left alone; `policy` is consulted once per
/// differing field.
///
/// # Errors
///
/// Propagates any error from `policy`.
pub fn resolve_divergences<P: ResolutionPolicy>(
    pairs: Vec<DivergencePair>,
    mut policy: P,
) -> Result<DivergenceResolution> {
    let mut resolution = DivergenceResolution {
        kept: Vec::with_capacity(pairs.len()),
        merged: Vec::with_capacity(pairs.len()),
        placements: Vec::with_capacity(pairs.len() * 2),
    };
    for pair in pairs {
        resolution.placements.extend(pair.placements());
        let mut merged = pair.authoritative.clone();
        for diff in pair.diffs() {
            let value = policy.choose(&pair.authoritative, &diff)?;
            diff.field.set(&mut merged, value)?;
        }
        resolution.kept.push(pair.kept);
        resolution.merged.push(merged);
    }
    Ok(resolution)
}
