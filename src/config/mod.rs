//! Configuration management for `git_issue`.
//!
//! Configuration is layered, lowest precedence first:
//! - Built-in defaults
//! - User config (`<config dir>/git-issue/config.yaml`)
//! - Repository config (`.git-issue.yaml` at the main checkout root)
//! - Environment variable overrides (`GIT_ISSUE_*`)
//! - Command-line flags

use issue_core::{DEFAULT_PREFIX, IndexLocation, Layout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{GitIssueError, Result};

/// Repository config file name.
pub const REPO_CONFIG_FILE: &str = ".git-issue.yaml";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the isolated issue branch.
    pub branch: String,
    /// Worktree location, relative to the repository root.
    pub worktree_dir: PathBuf,
    pub remote: String,
    pub prefix: String,
    pub index_location: IndexLocation,
    pub short_uuid_len: usize,
    /// Push after every committed action.
    pub auto_push: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            branch: "issue".to_string(),
            worktree_dir: PathBuf::from("issue"),
            remote: "origin".to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            index_location: IndexLocation::Comments,
            short_uuid_len: 8,
            auto_push: true,
        }
    }
}

/// One config layer; unset keys defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub branch: Option<String>,
    pub worktree_dir: Option<PathBuf>,
    pub remote: Option<String>,
    pub prefix: Option<String>,
    pub index_location: Option<IndexLocation>,
    pub short_uuid_len: Option<usize>,
    pub auto_push: Option<bool>,
}

impl PartialConfig {
    /// Read a YAML layer; a missing file is an empty layer.
    ///
    /// # Errors
    ///
    /// Returns `Yaml` if the file exists but is not a valid config.
    pub fn from_file(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Ok(Self::default()),
            Ok(text) => {
                tracing::debug!(path = %path.display(), "loaded config layer");
                Ok(serde_yaml::from_str(&text)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Layer built from `GIT_ISSUE_*` variables.
    #[must_use]
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            branch: lookup("GIT_ISSUE_BRANCH"),
            worktree_dir: lookup("GIT_ISSUE_WORKTREE").map(PathBuf::from),
            remote: lookup("GIT_ISSUE_REMOTE"),
            prefix: lookup("GIT_ISSUE_PREFIX"),
            ..Self::default()
        }
    }

    fn apply_to(self, config: &mut Config) {
        if let Some(v) = self.branch {
            config.branch = v;
        }
        if let Some(v) = self.worktree_dir {
            config.worktree_dir = v;
        }
        if let Some(v) = self.remote {
            config.remote = v;
        }
        if let Some(v) = self.prefix {
            config.prefix = v;
        }
        if let Some(v) = self.index_location {
            config.index_location = v;
        }
        if let Some(v) = self.short_uuid_len {
            config.short_uuid_len = v;
        }
        if let Some(v) = self.auto_push {
            config.auto_push = v;
        }
    }
}

impl Config {
    /// Default location of the user config file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("git-issue").join("config.yaml"))
    }

    /// Load every layer for the repository at `repo_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is malformed or the result fails
    /// validation.
    pub fn load(repo_root: &Path, flags: PartialConfig) -> Result<Self> {
        let user = match Self::user_config_path() {
            Some(path) => PartialConfig::from_file(&path)?,
            None => PartialConfig::default(),
        };
        let repo = PartialConfig::from_file(&repo_root.join(REPO_CONFIG_FILE))?;
        let env = PartialConfig::from_env(|key| std::env::var(key).ok());
        Self::from_layers([user, repo, env, flags])
    }

    /// Fold layers over the defaults, lowest precedence first.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the merged result is invalid.
    pub fn from_layers(layers: impl IntoIterator<Item = PartialConfig>) -> Result<Self> {
        let mut config = Self::default();
        for layer in layers {
            layer.apply_to(&mut config);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail deep inside git or the store.
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the first invalid key.
    pub fn validate(&self) -> Result<()> {
        if self.branch.trim().is_empty() || self.branch.contains(char::is_whitespace) {
            return Err(GitIssueError::Config(format!(
                "branch '{}' is not a valid branch name",
                self.branch
            )));
        }
        if self.remote.trim().is_empty() {
            return Err(GitIssueError::Config("remote cannot be empty".to_string()));
        }
        let valid_prefix = !self.prefix.is_empty()
            && self
                .prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_prefix {
            return Err(GitIssueError::Config(format!(
                "prefix '{}' must be alphanumeric",
                self.prefix
            )));
        }
        let plain = self.worktree_dir.components().next().is_some()
            && self
                .worktree_dir
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(GitIssueError::Config(format!(
                "worktree_dir '{}' must be a relative path inside the repository",
                self.worktree_dir.display()
            )));
        }
        if !(4..=32).contains(&self.short_uuid_len) {
            return Err(GitIssueError::Config(format!(
                "short_uuid_len must be between 4 and 32, got {}",
                self.short_uuid_len
            )));
        }
        Ok(())
    }

    /// Store layout options derived from this config.
    #[must_use]
    pub fn layout(&self) -> Layout {
        Layout {
            index_location: self.index_location,
            short_uuid_len: self.short_uuid_len,
        }
    }
}
