//! Allocation registry: stable uuid to human-facing id.
//!
//! `issue_count` is only a local high-water mark for proposing new ids.
//! Two replicas may propose the same id; create-conflict resolution
//! renumbers afterwards and records the outcome here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{DEFAULT_PREFIX, IssueId};

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// One uuid → id assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UuidTrack {
    pub uuid: Uuid,
    pub issue: IssueId,
}

/// Persisted allocation state (`tracker.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub issue_count: u64,
    #[serde(default)]
    pub tracked_uuids: Vec<UuidTrack>,
}

impl Registry {
    /// An empty registry for the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            issue_count: 0,
            tracked_uuids: Vec::new(),
        }
    }

    /// The id the next created issue would receive. Does not mutate.
    #[must_use]
    pub fn next_id(&self) -> IssueId {
        IssueId::new(self.prefix.clone(), self.issue_count + 1)
    }

    /// Advance the high-water mark and return the newly reserved id.
    pub fn reserve_next_id(&mut self) -> IssueId {
        self.issue_count += 1;
        IssueId::new(self.prefix.clone(), self.issue_count)
    }

    /// Upsert the uuid → id mapping. Idempotent.
    pub fn record(&mut self, uuid: Uuid, id: IssueId) {
        self.observe(&id);
        if let Some(tracked) = self.tracked_uuids.iter_mut().find(|t| t.uuid == uuid) {
            if tracked.issue != id {
                tracing::debug!(%uuid, from = %tracked.issue, to = %id, "reassigned issue id");
                tracked.issue = id;
            }
            return;
        }
        self.tracked_uuids.push(UuidTrack { uuid, issue: id });
    }

    /// The id currently assigned to `uuid`, if known.
    #[must_use]
    pub fn resolve(&self, uuid: Uuid) -> Option<&IssueId> {
        self.tracked_uuids
            .iter()
            .find(|t| t.uuid == uuid)
            .map(|t| &t.issue)
    }

    /// Raise the high-water mark so it never trails a known id.
    pub fn observe(&mut self, id: &IssueId) {
        if id.prefix() == self.prefix && id.number() > self.issue_count {
            self.issue_count = id.number();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked_uuids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked_uuids.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
