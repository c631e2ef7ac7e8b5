//! Registry reconstruction.
//!
//! A conflicted `tracker.json` is never merged field by field. The
//! registry is rebuilt from every stage plus the issues readable on disk,
//! and the create and divergence resolutions are recorded on top.

use crate::document::Document;
use crate::error::Result;
use crate::merge::conflict::{ConflictInfo, ConflictType, Stage};
use crate::registry::Registry;
use crate::store::IssueStore;

/// The registry a merge should start from.
///
/// Without a tracker conflict this is simply the registry on disk.
///
/// # Errors
///
/// Returns an error if the on-disk registry cannot be decoded, or if the
/// issue folders cannot be listed.
pub fn base_registry(conflict: Option<&ConflictInfo>, store: &IssueStore) -> Result<Registry> {
    match conflict.filter(|c| c.kind == ConflictType::Tracker) {
        Some(conflict) => rebuild_registry(conflict, store),
        None => store.load_registry(),
    }
}

/// Rebuild a registry from the stages of a tracker conflict.
///
/// Stages are layered base, theirs, ours so the current branch wins any
/// disagreement; readable issues on disk override all of them. The high
/// water mark is the maximum seen anywhere.
///
/// # Errors
///
/// Returns `Io` if the issue folders cannot be listed.
pub fn rebuild_registry(conflict: &ConflictInfo, store: &IssueStore) -> Result<Registry> {
    let mut registry = Registry::new(store.prefix());
    for stage in [Stage::Base, Stage::Theirs, Stage::Ours] {
        let Some(Document::Tracker(staged)) = conflict.document(stage) else {
            continue;
        };
        registry.issue_count = registry.issue_count.max(staged.issue_count);
        for tracked in &staged.tracked_uuids {
            registry.record(tracked.uuid, tracked.issue.clone());
        }
    }
    for issue in store.all_readable()? {
        registry.record(issue.uuid, issue.id.clone());
    }
    tracing::debug!(
        tracked = registry.len(),
        issue_count = registry.issue_count,
        "rebuilt registry"
    );
    Ok(registry)
}
