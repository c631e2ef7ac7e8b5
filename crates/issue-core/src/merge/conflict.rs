//! Typed view of a three-way merge conflict.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use crate::document::Document;
use crate::model::Issue;

/// One of the three index stages git reports for an unmerged path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Common ancestor (stage 1).
    Base,
    /// Current branch (stage 2).
    Ours,
    /// Incoming branch (stage 3).
    Theirs,
}

impl Stage {
    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Base),
            2 => Some(Self::Ours),
            3 => Some(Self::Theirs),
            _ => None,
        }
    }
}

/// Raw content of one stage of an unmerged path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmergedBlob {
    pub path: PathBuf,
    pub stage: Stage,
    pub content: String,
}

/// A decoded stage. `document` is `None` when the content is not a
/// recognisable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedVersion {
    pub stage: Stage,
    pub document: Option<Document>,
}

/// How a conflict can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictType {
    /// Two branches allocated the same id to different issues.
    Create,
    /// The allocation registry itself.
    Tracker,
    /// Two comment indices appended independently.
    CommentIndex,
    /// An issue renumbered by a create resolution was edited elsewhere.
    CreateEditDivergence,
    /// Needs a human.
    Manual,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Tracker => "tracker",
            Self::CommentIndex => "comment-index",
            Self::CreateEditDivergence => "create-edit-divergence",
            Self::Manual => "manual",
        })
    }
}

/// All competing versions of a single conflicting path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictInfo {
    pub path: PathBuf,
    pub versions: Vec<StagedVersion>,
    pub kind: ConflictType,
}

impl ConflictInfo {
    /// Build and classify a conflict from its decoded stages.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mut versions: Vec<StagedVersion>) -> Self {
        versions.sort_by_key(|v| v.stage);
        let kind = classify(&versions);
        Self {
            path: path.into(),
            versions,
            kind,
        }
    }

    /// Decode raw stage contents. Undecodable stages are kept as `None`.
    #[must_use]
    pub fn from_stages(path: impl Into<PathBuf>, stages: Vec<(Stage, String)>) -> Self {
        let path = path.into();
        let versions = stages
            .into_iter()
            .map(|(stage, content)| {
                let document = match Document::decode(&path, &content) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        tracing::debug!(path = %path.display(), ?stage, error = %e, "undecodable stage");
                        None
                    }
                };
                StagedVersion { stage, document }
            })
            .collect();
        Self::new(path, versions)
    }

    /// The decoded document at `stage`, if that stage is present.
    #[must_use]
    pub fn document(&self, stage: Stage) -> Option<&Document> {
        self.versions
            .iter()
            .find(|v| v.stage == stage)
            .and_then(|v| v.document.as_ref())
    }

    /// The issue at `stage`, if that stage holds one.
    #[must_use]
    pub fn issue(&self, stage: Stage) -> Option<&Issue> {
        match self.document(stage) {
            Some(Document::Issue(issue)) => Some(issue),
            _ => None,
        }
    }

    /// Every issue version, in stage order.
    pub fn issues(&self) -> impl Iterator<Item = (Stage, &Issue)> {
        self.versions.iter().filter_map(|v| match &v.document {
            Some(Document::Issue(issue)) => Some((v.stage, issue)),
            _ => None,
        })
    }
}

/// Classify a conflict by the content of its stages.
#[must_use]
pub fn classify(versions: &[StagedVersion]) -> ConflictType {
    let Some(documents) = versions
        .iter()
        .map(|v| v.document.as_ref())
        .collect::<Option<Vec<_>>>()
    else {
        return ConflictType::Manual;
    };
    if documents.is_empty() {
        return ConflictType::Manual;
    }

    if documents.iter().all(|d| matches!(d, Document::Issue(_))) {
        let uuids: HashSet<_> = documents
            .iter()
            .filter_map(|d| match d {
                Document::Issue(issue) => Some(issue.uuid),
                _ => None,
            })
            .collect();

        return match (uuids.len(), documents.len()) {
            (2, 3) => ConflictType::CreateEditDivergence,
            (distinct, _) if distinct > 1 => ConflictType::Create,
            _ => ConflictType::Manual,
        };
    }
    if documents.iter().all(|d| matches!(d, Document::Tracker(_))) {
        return ConflictType::Tracker;
    }
    if documents.iter().all(|d| matches!(d, Document::CommentIndex(_))) {
        return ConflictType::CommentIndex;
    }
    ConflictType::Manual
}

/// Group unmerged blobs by path and classify each path.
///
/// The result is ordered by path so repeated runs see the same sequence.
#[must_use]
pub fn parse_conflicts(blobs: impl IntoIterator<Item = UnmergedBlob>) -> Vec<ConflictInfo> {
    let mut by_path: BTreeMap<PathBuf, Vec<(Stage, String)>> = BTreeMap::new();
    for blob in blobs {
        by_path
            .entry(blob.path)
            .or_default()
            .push((blob.stage, blob.content));
    }
    by_path
        .into_iter()
        .map(|(path, stages)| ConflictInfo::from_stages(path, stages))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::encode;
    use crate::index::CommentIndex;
    use crate::model::IssueId;
    use crate::registry::Registry;

    fn issue(n: u64) -> Issue {
        Issue::new(IssueId::new("ISSUE", n), format!("issue {n}"))
    }

    fn staged(stage: Stage, doc: Document) -> StagedVersion {
        StagedVersion {
            stage,
            document: Some(doc),
        }
    }

    #[test]
    fn test_two_uuids_two_stages_is_create() {
        let a = issue(1);
        let b = issue(1);
        let info = ConflictInfo::new(
            "ISSUE-1/issue.json",
            vec![
                staged(Stage::Ours, Document::Issue(a)),
                staged(Stage::Theirs, Document::Issue(b)),
            ],
        );
        assert_eq!(info.kind, ConflictType::Create);
    }

    #[test]
    fn test_two_uuids_three_stages_is_divergence() {
        let original = issue(3);
        let mut edited = original.clone();
        edited.summary = "edited".to_string();
        let replacement = issue(3);

        let info = ConflictInfo::new(
            "ISSUE-3/issue.json",
            vec![
                staged(Stage::Theirs, Document::Issue(edited)),
                staged(Stage::Base, Document::Issue(original)),
                staged(Stage::Ours, Document::Issue(replacement)),
            ],
        );
        assert_eq!(info.kind, ConflictType::CreateEditDivergence);
        assert_eq!(info.versions[0].stage, Stage::Base);
    }

    #[test]
    fn test_three_distinct_uuids_is_create() {
        let info = ConflictInfo::new(
            "ISSUE-1/issue.json",
            vec![
                staged(Stage::Base, Document::Issue(issue(1))),
                staged(Stage::Ours, Document::Issue(issue(1))),
                staged(Stage::Theirs, Document::Issue(issue(1))),
            ],
        );
        assert_eq!(info.kind, ConflictType::Create);
    }

    #[test]
    fn test_same_uuid_edit_is_manual() {
        let base = issue(1);
        let mut ours = base.clone();
        ours.summary = "ours".to_string();
        let mut theirs = base.clone();
        theirs.summary = "theirs".to_string();

        let info = ConflictInfo::new(
            "ISSUE-1/issue.json",
            vec![
                staged(Stage::Base, Document::Issue(base)),
                staged(Stage::Ours, Document::Issue(ours)),
                staged(Stage::Theirs, Document::Issue(theirs)),
            ],
        );
        assert_eq!(info.kind, ConflictType::Manual);
    }

    #[test]
    fn test_tracker_and_index_kinds() {
        let tracker = ConflictInfo::new(
            "tracker.json",
            vec![
                staged(Stage::Ours, Document::Tracker(Registry::default())),
                staged(Stage::Theirs, Document::Tracker(Registry::default())),
            ],
        );
        assert_eq!(tracker.kind, ConflictType::Tracker);

        let index = ConflictInfo::new(
            "ISSUE-1/comments/index.json",
            vec![
                staged(Stage::Ours, Document::CommentIndex(CommentIndex::default())),
                staged(Stage::Theirs, Document::CommentIndex(CommentIndex::default())),
            ],
        );
        assert_eq!(index.kind, ConflictType::CommentIndex);
    }

    #[test]
    fn test_mixed_or_undecodable_is_manual() {
        let mixed = ConflictInfo::new(
            "x.json",
            vec![
                staged(Stage::Ours, Document::Issue(issue(1))),
                staged(Stage::Theirs, Document::Tracker(Registry::default())),
            ],
        );
        assert_eq!(mixed.kind, ConflictType::Manual);

        let raw = ConflictInfo::from_stages(
            "README.md",
            vec![
                (Stage::Ours, "hello".to_string()),
                (Stage::Theirs, "world".to_string()),
            ],
        );
        assert_eq!(raw.kind, ConflictType::Manual);
        assert!(raw.versions.iter().all(|v| v.document.is_none()));
    }

    #[test]
    fn test_parse_conflicts_groups_by_path() {
        let a = issue(1);
        let b = issue(1);
        let blobs = vec![
            UnmergedBlob {
                path: "ISSUE-1/issue.json".into(),
                stage: Stage::Theirs,
                content: encode(&b).unwrap(),
            },
            UnmergedBlob {
                path: "tracker.json".into(),
                stage: Stage::Ours,
                content: encode(&Registry::default()).unwrap(),
            },
            UnmergedBlob {
                path: "ISSUE-1/issue.json".into(),
                stage: Stage::Ours,
                content: encode(&a).unwrap(),
            },
        ];

        let conflicts = parse_conflicts(blobs);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].path, PathBuf::from("ISSUE-1/issue.json"));
        assert_eq!(conflicts[0].kind, ConflictType::Create);
        assert_eq!(conflicts[0].issue(Stage::Ours), Some(&a));
        assert_eq!(conflicts[1].kind, ConflictType::Tracker);
    }
}
