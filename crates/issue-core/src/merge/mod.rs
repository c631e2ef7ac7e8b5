//! Semantic merge of conflicting issue-branch documents.
//!
//! A textual merge of two issue branches can only fail in a few ways that
//! matter: both sides allocated the same id, both sides appended comments,
//! both sides advanced the registry, or one side edited an issue the other
//! renumbered. Each has a resolver here, and renumbered issues take their
//! comments along; everything else is left for a human.
//!
//! Resolvers compute first and write only in [`Resolution::apply`], so a
//! failing resolver leaves the working tree as git left it.

pub mod comment_index;
pub mod conflict;
pub mod create;
pub mod divergence;
pub mod relocate;
pub mod tracker;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::Result;
use crate::registry::Registry;
use crate::store::IssueStore;

pub use comment_index::{CommentIndexResolution, resolve_comment_index};
pub use conflict::{
    ConflictInfo, ConflictType, Stage, StagedVersion, UnmergedBlob, classify, parse_conflicts,
};
pub use create::{CreateResolution, resolve_create};
pub use divergence::{
    DivergencePair, DivergenceResolution, FieldDiff, FieldValue, IssueField, PreferCurrent,
    PreferIncoming, ResolutionPolicy, diff_fields, match_divergences, resolve_divergences,
};
pub use relocate::{CommentRelocation, Placement, relocate_comments, unconflicted_index_paths};
pub use tracker::{base_registry, rebuild_registry};

/// A computed resolution of one conflict category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Create(CreateResolution),
    Divergence(DivergenceResolution),
    CommentIndex(CommentIndexResolution),
    Comments(CommentRelocation),
    Tracker(Registry),
}

impl Resolution {
    /// Persist this resolution and return the paths written.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a document cannot be written.
    pub fn apply(&self, store: &IssueStore) -> Result<Vec<PathBuf>> {
        match self {
            Self::Create(resolution) => resolution.apply(store),
            Self::Divergence(resolution) => resolution.apply(store),
            Self::CommentIndex(resolution) => resolution.apply(store),
            Self::Comments(relocation) => relocation.apply(store),
            Self::Tracker(registry) => Ok(vec![store.save_registry(registry)?]),
        }
    }
}

/// Result of a merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Paths written by resolvers, relative to the store root. These must
    /// be staged before the merge can be committed.
    pub resolved: Vec<PathBuf>,
    /// Conflicting paths no resolver handled.
    pub manual: Vec<PathBuf>,
    pub created: usize,
    pub diverged: usize,
    pub comment_indices: usize,
    /// Comment files moved to follow a renumbered issue.
    pub moved_comments: usize,
}

impl MergeReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.manual.is_empty()
    }
}

/// Runs every resolver over one set of conflicts.
pub struct Merger<'a, P> {
    store: &'a IssueStore,
    policy: P,
}

impl<'a, P: ResolutionPolicy> Merger<'a, P> {
    #[must_use]
    pub const fn new(store: &'a IssueStore, policy: P) -> Self {
        Self { store, policy }
    }

    /// Compute every resolution without writing anything.
    ///
    /// Order matters: divergence matching looks at the create output, the
    /// registry collects the outcome of both, and comments follow every
    /// issue either of them moved. Index conflicts settled by that move are
    /// not unioned again.
    ///
    /// # Errors
    ///
    /// Returns `DivergenceMatchMissing` if a divergence cannot be matched,
    /// or any error raised by the resolution policy or the store.
    pub fn plan(&mut self, conflicts: &[ConflictInfo]) -> Result<Vec<Resolution>> {
        let of_kind = |kind: ConflictType| {
            conflicts
                .iter()
                .filter(|c| c.kind == kind)
                .collect::<Vec<_>>()
        };

        let tracker = of_kind(ConflictType::Tracker);
        let mut registry = base_registry(tracker.first().copied(), self.store)?;
        let mut plan = Vec::new();

        let creates = of_kind(ConflictType::Create);
        let mut renumbered = Vec::new();
        let mut placements = Vec::new();
        if !creates.is_empty() {
            let resolution = resolve_create(&creates, self.store, &registry)?;
            registry = resolution.registry.clone();
            renumbered.clone_from(&resolution.issues);
            placements.extend(resolution.placements.iter().cloned());
            plan.push(Resolution::Create(resolution));
        }

        let divergences = of_kind(ConflictType::CreateEditDivergence);
        if !divergences.is_empty() {
            let pairs = match_divergences(&divergences, &renumbered, &registry, self.store)?;
            let resolution = resolve_divergences(pairs, &mut self.policy)?;
            for issue in resolution.issues() {
                registry.record(issue.uuid, issue.id.clone());
            }
            placements.extend(resolution.placements.iter().cloned());
            plan.push(Resolution::Divergence(resolution));
        }

        let relocation = relocate_comments(&placements, conflicts, self.store)?;
        plan.extend(
            of_kind(ConflictType::CommentIndex)
                .into_iter()
                .filter(|c| !relocation.covered.contains(&c.path))
                .filter_map(resolve_comment_index)
                .map(Resolution::CommentIndex),
        );
        if !relocation.is_empty() {
            plan.push(Resolution::Comments(relocation));
        }

        if !tracker.is_empty() || !creates.is_empty() || !divergences.is_empty() {
            plan.push(Resolution::Tracker(registry));
        }
        Ok(plan)
    }

    /// Resolve and persist every automatically resolvable conflict.
    ///
    /// # Errors
    ///
    /// Same as [`plan`](Self::plan), plus `Io` on write failure. Nothing is
    /// written if planning fails.
    pub fn run(&mut self, conflicts: &[ConflictInfo]) -> Result<MergeReport> {
        let plan = self.plan(conflicts)?;
        let mut report = MergeReport::default();
        let mut written = BTreeSet::new();
        let mut settled = BTreeSet::new();

        for resolution in &plan {
            match resolution {
                Resolution::Create(r) => report.created += r.issues.len(),
                Resolution::Divergence(r) => report.diverged += r.merged.len(),
                Resolution::CommentIndex(_) => report.comment_indices += 1,
                Resolution::Comments(r) => {
                    report.moved_comments += r.copies.len();
                    settled.extend(r.covered.iter().cloned());
                }
                Resolution::Tracker(_) => {}
            }
            for path in resolution.apply(self.store)? {
                written.insert(self.store.relative(&path));
            }
        }

        for conflict in conflicts {
            let handled = written.contains(&conflict.path) || settled.contains(&conflict.path);
            if conflict.kind == ConflictType::Manual || !handled {
                tracing::warn!(path = %conflict.path.display(), kind = %conflict.kind, "conflict needs manual resolution");
                report.manual.push(conflict.path.clone());
            }
        }
        report.resolved = written.into_iter().collect();
        tracing::info!(
            resolved = report.resolved.len(),
            manual = report.manual.len(),
            "merge pass finished"
        );
        Ok(report)
    }
}
