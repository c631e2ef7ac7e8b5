//! Explicit per-invocation context: which repository, which config.
//!
//! Everything that touches git or the issue branch receives a
//! [`Workspace`] instead of consulting the process's current directory.

use issue_core::IssueStore;
use std::path::{Path, PathBuf};

use crate::config::{Config, PartialConfig};
use crate::error::Result;
use crate::git::Git;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    git: Git,
    config: Config,
}

impl Workspace {
    /// Locate the repository containing `start` and load its config.
    ///
    /// # Errors
    ///
    /// Returns `NotARepository` if `start` is outside a git work tree, or a
    /// configuration error.
    pub fn discover(start: &Path, flags: PartialConfig) -> Result<Self> {
        let root = Git::discover(start)?;
        let config = Config::load(&root, flags)?;
        tracing::debug!(root = %root.display(), branch = %config.branch, "opened workspace");
        Ok(Self::open(root, config))
    }

    #[must_use]
    pub fn open(root: impl Into<PathBuf>, config: Config) -> Self {
        let root = root.into();
        Self {
            git: Git::new(&root),
            root,
            config,
        }
    }

    /// Main checkout root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Git bound to the main checkout.
    #[must_use]
    pub const fn git(&self) -> &Git {
        &self.git
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Where the issue branch is attached.
    #[must_use]
    pub fn worktree_path(&self) -> PathBuf {
        self.root.join(&self.config.worktree_dir)
    }

    /// An issue store over a checked-out issue branch at `dir`.
    #[must_use]
    pub fn store_at(&self, dir: &Path) -> IssueStore {
        IssueStore::new(dir, self.config.prefix.clone(), self.config.layout())
    }
}
