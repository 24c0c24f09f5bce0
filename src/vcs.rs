//! Git collaborator for changelog generation.
//!
//! All repository access goes through [`Repo`]: listing unreleased commits,
//! resolving version tags, and staging/committing the rendered changelog.
use git2::{Repository, StatusOptions};
use log::*;
use std::path::Path;

use crate::error::{ChangelogError, Result};

/// Raw commit data handed to the extractor's commit-log reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLog {
    pub short_hash: String,
    pub hash: String,
    pub message: String,
}

/// Current working tree state.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    pub dirty: bool,
    pub branch: String,
}

/// Wrapper around a discovered git repository.
pub struct Repo {
    inner: Repository,
    commit_enabled: bool,
    dry_run: bool,
}

impl Repo {
    /// Discover the repository containing `path`.
    pub fn open(path: &Path, commit_enabled: bool, dry_run: bool) -> Result<Self> {
        Ok(Self {
            inner: Repository::discover(path)?,
            commit_enabled,
            dry_run,
        })
    }

    /// Get current state info: dirty working tree and checked out branch.
    pub fn current_info(&self) -> Result<RepoInfo> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true);

        let statuses = self.inner.statuses(Some(&mut opts))?;
        let dirty = !statuses.is_empty();

        let head = self.inner.head().map_err(|e| {
            ChangelogError::vcs(format!("unable to get current branch: {}", e))
        })?;
        let branch = head.shorthand().unwrap_or("HEAD").to_string();

        Ok(RepoInfo { dirty, branch })
    }

    /// Find the tag for a version string: given `0.1.2`, resolves `v0.1.2`,
    /// `0.1.2` and similar.
    pub fn find_tag(&self, version: &str) -> Result<Option<String>> {
        let names = self.inner.tag_names(Some(&format!("*{}", version)))?;
        Ok(names.iter().flatten().next().map(|name| name.to_string()))
    }

    /// List commits since `tag` (newest first). With no tag the full history
    /// from HEAD is returned.
    pub fn commits_since(&self, tag: Option<&str>) -> Result<Vec<CommitLog>> {
        let mut walk = self.inner.revwalk()?;
        walk.push_head()?;

        if let Some(tag) = tag {
            let target = self.inner.revparse_single(tag)?.peel_to_commit()?;
            walk.hide(target.id())?;
        }

        let mut logs = vec![];

        for oid in walk {
            let oid = oid?;
            let commit = self.inner.find_commit(oid)?;

            let short = commit.as_object().short_id()?;
            let short_hash = short.as_str().unwrap_or_default().to_string();

            logs.push(CommitLog {
                short_hash,
                hash: oid.to_string(),
                message: commit.message().unwrap_or_default().to_string(),
            });
        }

        Ok(logs)
    }

    /// Stage updates to already-tracked files under `path`.
    pub fn stage(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            warn!("  would add path '{}' to git", path.display());
            return Ok(());
        }

        let mut index = self.inner.index()?;
        index.update_all([path], None)?;
        index.write()?;

        Ok(())
    }

    /// Commit staged changelog updates.
    pub fn commit(&self, version: &str, paths: &[&Path]) -> Result<()> {
        warn!("preparing git commit");

        for path in paths {
            self.stage(path)?;
        }

        let message = format!("Update CHANGELOG for {}", version);

        if self.dry_run || !self.commit_enabled {
            warn!("  would commit to git with message '{}'", message);
            return Ok(());
        }

        let mut index = self.inner.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.inner.find_tree(tree_id)?;
        let signature = self.inner.signature()?;
        let head = self.inner.head()?.peel_to_commit()?;

        self.inner
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &message,
                &tree,
                &[&head],
            )
            .map_err(|e| {
                ChangelogError::vcs(format!("unable to commit: {}", e))
            })?;

        Ok(())
    }
}
