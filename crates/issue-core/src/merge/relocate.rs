//! Comments follow their issue when it is renumbered.
//!
//! Comment files live in their issue's folder, so a resolution that moves
//! an issue has to move its comments as well. A folder both branches
//! claimed holds both issues' comments side by side; which entries belong
//! to which issue is read from the index stage matching the stage the
//! issue itself came from.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use crate::document::Document;
use crate::error::{IssueError, Result};
use crate::index::{CommentIndex, IndexEntry};
use crate::merge::conflict::{ConflictInfo, ConflictType, Stage};
use crate::model::IssueId;
use crate::store::IssueStore;

/// Where an issue taking part in a resolution was found, and where it ends
/// up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub uuid: Uuid,
    /// Folder the issue was read from.
    pub from: IssueId,
    /// Id it holds once resolved.
    pub to: IssueId,
    /// Conflict stage it was read from; `None` for an issue that was
    /// already settled on disk.
    pub stage: Option<Stage>,
}

impl Placement {
    #[must_use]
    pub fn moves(&self) -> bool {
        self.from != self.to
    }
}

/// Comment files and indices rewritten after renumbering. Nothing is
/// written until [`apply`].
///
/// [`apply`]: CommentRelocation::apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentRelocation {
    /// Final index of every affected id.
    pub indices: Vec<(IssueId, CommentIndex)>,
    /// Comment files to copy, `(from, to)`, relative to the store root.
    pub copies: Vec<(PathBuf, PathBuf)>,
    /// Comment files no longer referenced from their folder.
    pub removals: Vec<PathBuf>,
    /// Index paths this relocation settles, relative to the store root.
    pub covered: Vec<PathBuf>,
}

impl CommentRelocation {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Move comment files and write the final indices. An id left without
    /// comments loses its index file.
    ///
    /// Every copied file is read before anything is removed, since one
    /// folder can be both a source and a destination.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a file cannot be read, removed or written.
    pub fn apply(&self, store: &IssueStore) -> Result<Vec<PathBuf>> {
        let contents = self
            .copies
            .iter()
            .map(|(from, to)| Ok((store.absolute(to), fs::read(store.absolute(from))?)))
            .collect::<Result<Vec<_>>>()?;

        let mut touched = Vec::new();
        for path in &self.removals {
            let path = store.absolute(path);
            if path.is_file() {
                fs::remove_file(&path)?;
                touched.push(path);
            }
        }
        for (path, bytes) in contents {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, bytes)?;
            touched.push(path);
        }
        for (id, index) in &self.indices {
            let path = store.index_path(id);
            if !index.is_empty() {
                touched.push(store.write_index(id, index)?);
            } else if path.is_file() {
                fs::remove_file(&path)?;
                touched.push(path);
            }
        }
        Ok(touched)
    }
}

/// Work out where every comment of every placed issue belongs.
///
/// Returns an empty relocation when no placement changes id.
///
/// # Errors
///
/// Returns `Io` if an index on disk cannot be read.
pub fn relocate_comments(
    placements: &[Placement],
    conflicts: &[ConflictInfo],
    store: &IssueStore,
) -> Result<CommentRelocation> {
    if !placements.iter().any(Placement::moves) {
        return Ok(CommentRelocation::default());
    }

    let index_conflicts: HashMap<&PathBuf, &ConflictInfo> = conflicts
        .iter()
        .filter(|c| c.kind == ConflictType::CommentIndex)
        .map(|c| (&c.path, c))
        .collect();
    let index_of = |id: &IssueId| store.relative(&store.index_path(id));
    let conflict_at = |id: &IssueId| index_conflicts.get(&index_of(id)).copied();

    let sources: BTreeSet<IssueId> = placements.iter().map(|p| p.from.clone()).collect();

    // destination -> (folder the entry comes from, entry)
    let mut claims: BTreeMap<IssueId, Vec<(IssueId, IndexEntry)>> = BTreeMap::new();
    for id in &sources {
        claims.entry(id.clone()).or_default();
    }
    for placement in placements {
        let entries = placed_entries(placement, placements, conflict_at(&placement.from), store)?;
        claims
            .entry(placement.to.clone())
            .or_default()
            .extend(entries.into_iter().map(|e| (placement.from.clone(), e)));
    }
    // A destination nobody moves out of keeps what it already holds.
    for (id, held) in &mut claims {
        if !sources.contains(id) {
            let settled = settled_entries(id, conflict_at(id), store)?;
            held.extend(settled.into_iter().map(|e| (id.clone(), e)));
        }
    }

    let mut relocation = CommentRelocation::default();
    let mut finals: BTreeMap<IssueId, CommentIndex> = BTreeMap::new();
    let mut moved_out: BTreeSet<(IssueId, String)> = BTreeSet::new();

    for (dest, held) in claims {
        let dest_dir = store.comments_dir(&dest);
        let mut copied = BTreeSet::new();
        let mut entries = Vec::with_capacity(held.len());
        for (from, entry) in held {
            if from != dest {
                let src = store.comments_dir(&from).join(&entry.path);
                let dst = dest_dir.join(&entry.path);
                if src.is_file() {
                    if copied.insert(entry.path.clone()) {
                        relocation
                            .copies
                            .push((store.relative(&src), store.relative(&dst)));
                    }
                    moved_out.insert((from.clone(), entry.path.clone()));
                } else if !dst.is_file() {
                    tracing::warn!(folder = %from, entry = %entry.path, "comment file is missing; dropping its index entry");
                    continue;
                }
            }
            entries.push(entry);
        }
        let index = CommentIndex::merge([&CommentIndex::new(entries)]);
        if !copied.is_empty() {
            tracing::debug!(id = %dest, files = copied.len(), "moving comments");
        }
        finals.insert(dest, index);
    }

    for (from, path) in moved_out {
        let stays = finals.get(&from).is_some_and(|index| index.has_entry(&path));
        if !stays {
            relocation
                .removals
                .push(store.relative(&store.comments_dir(&from).join(&path)));
        }
    }
    relocation.covered = finals.keys().map(index_of).collect();
    relocation.indices = finals.into_iter().collect();
    Ok(relocation)
}

/// Index paths of folders in a create or divergence conflict whose index
/// merged cleanly.
///
/// A clean merge hides which branch wrote the entries, so the caller
/// supplies both branches' versions of these paths as extra conflicts.
#[must_use]
pub fn unconflicted_index_paths(conflicts: &[ConflictInfo], store: &IssueStore) -> Vec<PathBuf> {
    let conflicted: BTreeSet<&PathBuf> = conflicts.iter().map(|c| &c.path).collect();
    let folders: BTreeSet<IssueId> = conflicts
        .iter()
        .filter(|c| {
            matches!(
                c.kind,
                ConflictType::Create | ConflictType::CreateEditDivergence
            )
        })
        .filter_map(|c| c.issues().next().map(|(_, issue)| issue.id.clone()))
        .collect();
    folders
        .iter()
        .map(|id| store.relative(&store.index_path(id)))
        .filter(|path| !conflicted.contains(path))
        .collect()
}

/// Entries belonging to one placed issue, read from the folder it left.
fn placed_entries(
    placement: &Placement,
    placements: &[Placement],
    conflict: Option<&ConflictInfo>,
    store: &IssueStore,
) -> Result<Vec<IndexEntry>> {
    match (placement.stage, conflict) {
        (None, conflict) => settled_entries(&placement.from, conflict, store),
        (Some(stage), Some(conflict)) => Ok(match conflict.document(stage) {
            Some(Document::CommentIndex(index)) => index.entries.clone(),
            _ => Vec::new(),
        }),
        (Some(_), None) => {
            // Without both sides, the index on disk goes to whoever keeps
            // the folder, or else to the current branch's issue.
            let owner = placements
                .iter()
                .filter(|p| p.from == placement.from && p.stage.is_some())
                .min_by_key(|p| (p.moves(), p.stage));
            if owner == Some(placement) {
                disk_entries(&placement.from, store)
            } else {
                Ok(Vec::new())
            }
        }
    }
}

/// Entries of a folder whose issue is not split between branches.
fn settled_entries(
    id: &IssueId,
    conflict: Option<&ConflictInfo>,
    store: &IssueStore,
) -> Result<Vec<IndexEntry>> {
    match conflict {
        Some(conflict) => {
            let stages = conflict.versions.iter().filter_map(|v| match &v.document {
                Some(Document::CommentIndex(index)) => Some(index),
                _ => None,
            });
            Ok(CommentIndex::merge(stages).entries)
        }
        None => disk_entries(id, store),
    }
}

/// Entries of the index on disk. One git left conflicted beyond decoding is
/// reported as a manual conflict, so it contributes nothing here.
fn disk_entries(id: &IssueId, store: &IssueStore) -> Result<Vec<IndexEntry>> {
    match store.comment_index(id) {
        Ok(index) => Ok(index.entries),
        Err(IssueError::Decode { .. } | IssueError::UnexpectedDocument { .. }) => {
            tracing::warn!(%id, "comment index cannot be decoded; leaving it for manual resolution");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}
