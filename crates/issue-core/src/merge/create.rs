//! Create-conflict resolution.
//!
//! Replicas allocate ids from a local high-water mark, so two branches can
//! hand out the same id to different issues. Resolution collects every
//! competing issue, claims just enough ids to hold them (pulling in any
//! issue already sitting on a claimed id), and reassigns ids by creation
//! date.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{IssueError, Result};
use crate::merge::conflict::{ConflictInfo, ConflictType, Stage};
use crate::merge::relocate::Placement;
use crate::model::{Issue, IssueId};
use crate::registry::Registry;
use crate::store::IssueStore;

/// Outcome of a create resolution. Nothing is written until [`apply`].
///
/// [`apply`]: CreateResolution::apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResolution {
    /// Every affected issue with its final id, in id order.
    pub issues: Vec<Issue>,
    /// Where each of `issues` was found, in the same order.
    pub placements: Vec<Placement>,
    /// The registry with every reassignment recorded.
    pub registry: Registry,
}

impl CreateResolution {
    /// The final id given to `uuid`, if it took part in this resolution.
    #[must_use]
    pub fn id_of(&self, uuid: Uuid) -> Option<&IssueId> {
        self.issues.iter().find(|i| i.uuid == uuid).map(|i| &i.id)
    }

    /// Write every renumbered issue. The registry is persisted by the caller.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a document cannot be written.
    pub fn apply(&self, store: &IssueStore) -> Result<Vec<PathBuf>> {
        self.issues.iter().map(|issue| store.write_issue(issue)).collect()
    }
}

/// Resolve every create conflict in one pass.
///
/// Conflicts of other kinds are ignored. The base stage never takes part:
/// an issue that held the id in the common ancestor has already been moved
/// by whichever branch replaced it.
///
/// # Errors
///
/// Returns `Io` if the store cannot be read.
pub fn resolve_create(
    conflicts: &[&ConflictInfo],
    store: &IssueStore,
    registry: &Registry,
) -> Result<CreateResolution> {
    // uuid -> (folder it was found in, stage it was read from)
    let mut origins: HashMap<Uuid, (IssueId, Option<Stage>)> = HashMap::new();
    let mut working: Vec<Issue> = Vec::new();
    let mut claimed: BTreeSet<IssueId> = BTreeSet::new();

    for conflict in conflicts
        .iter()
        .filter(|c| c.kind == ConflictType::Create)
    {
        for (stage, issue) in conflict.issues() {
            if stage == Stage::Base || origins.contains_key(&issue.uuid) {
                continue;
            }
            origins.insert(issue.uuid, (issue.id.clone(), Some(stage)));
            claimed.insert(issue.id.clone());
            working.push(issue.clone());
        }
    }

    let Some(lowest) = claimed.first().cloned() else {
        return Ok(CreateResolution {
            issues: Vec::new(),
            placements: Vec::new(),
            registry: registry.clone(),
        });
    };

    // Claim ids above the lowest conflicting id until every issue has one.
    // An issue already sitting on a claimed id joins the working set.
    let mut candidate = lowest;
    while claimed.len() < working.len() {
        candidate = candidate.next()?;
        if claimed.contains(&candidate) {
            continue;
        }
        match store.get(&candidate) {
            Ok(Some(occupant)) => {
                if !origins.contains_key(&occupant.uuid) {
                    tracing::debug!(id = %candidate, uuid = %occupant.uuid, "pulled occupant into create resolution");
                    origins.insert(occupant.uuid, (candidate.clone(), None));
                    working.push(occupant);
                }
            }
            Ok(None) => {}
            Err(IssueError::Decode { .. } | IssueError::UnexpectedDocument { .. }) => {
                tracing::debug!(id = %candidate, "skipping unreadable id during create resolution");
                continue;
            }
            Err(e) => return Err(e),
        }
        claimed.insert(candidate.clone());
    }

    assert_eq!(
        claimed.len(),
        working.len(),
        "create resolution must claim exactly one id per issue"
    );

    working.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.uuid.cmp(&b.uuid)));

    let mut registry = registry.clone();
    let mut issues = Vec::with_capacity(working.len());
    let mut placements = Vec::with_capacity(working.len());
    for (mut issue, id) in working.into_iter().zip(claimed) {
        if issue.id != id {
            tracing::info!(uuid = %issue.uuid, from = %issue.id, to = %id, "renumbered issue");
        }
        let (from, stage) = origins
            .remove(&issue.uuid)
            .unwrap_or_else(|| (issue.id.clone(), None));
        placements.push(Placement {
            uuid: issue.uuid,
            from,
            to: id.clone(),
            stage,
        });
        issue.id = id;
        registry.record(issue.uuid, issue.id.clone());
        issues.push(issue);
    }

    Ok(CreateResolution {
        issues,
        placements,
        registry,
    })
}
