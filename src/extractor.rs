//! Change extraction and semantic version resolution.
//!
//! Pending changes come from two sources: legacy one-file-per-change release
//! notes under `./release_notes`, and unreleased conventional commit messages
//! supplied by the git collaborator. Both are normalized into [`Change`]
//! records, merged into a section-keyed collection, and walked to decide the
//! minimal semver bump for the next release.
use log::*;
use regex::Regex;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use crate::{
    config::{SemverWeight, TypeRegistry},
    error::{ChangelogError, Result},
    vcs::CommitLog,
    version::VersionProvider,
};

/// One normalized pending change extracted from a note file or commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Issue reference; a synthetic `__N__` placeholder when a commit
    /// carries no `Refs:` trailer.
    pub issue_ref: String,
    pub description: String,
    pub commit_type: String,
    /// Parenthesized scope, e.g. `(docs)`.
    pub scope: Option<String>,
    pub breaking: bool,
    pub authors: Option<String>,
    /// Present only for commit-log-derived records.
    pub short_hash: Option<String>,
    pub commit_hash: Option<String>,
}

impl Change {
    /// Display-order key: breaking records first, then case-insensitive
    /// scope with scopeless records last, ties broken by case-insensitive
    /// issue ref.
    pub fn sort_key(&self) -> (bool, String, String) {
        let scope = self
            .scope
            .as_deref()
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "zzz".to_string());

        (!self.breaking, scope, self.issue_ref.to_lowercase())
    }

    /// Whether this record's issue ref is a synthetic `__N__` placeholder.
    /// Placeholders never participate in notification fan-out or link
    /// rendering.
    pub fn is_placeholder_ref(&self) -> bool {
        self.issue_ref.starts_with("__") && self.issue_ref.ends_with("__")
    }
}

/// Sort changes into their deterministic display order.
pub fn sort_changes(changes: &mut [Change]) {
    changes.sort_by_key(|c| c.sort_key());
}

/// Pending changes keyed by section header, then by issue ref.
pub type SectionMap = HashMap<String, HashMap<String, Change>>;

static REFS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Refs: #?([\w-]+)").unwrap());

static AUTHORS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Authors: (.*)").unwrap());

/// Parses pending change sources and produces section-keyed collections.
pub struct Extractor<'a> {
    release_notes: PathBuf,
    registry: &'a TypeRegistry,
    dry_run: bool,
}

impl<'a> Extractor<'a> {
    /// Create an extractor rooted at `root` using the supplied registry.
    pub fn new(root: &Path, registry: &'a TypeRegistry, dry_run: bool) -> Self {
        Self {
            release_notes: root.join("release_notes"),
            registry,
            dry_run,
        }
    }

    /// Extract all pending changes, merging release note files (when the
    /// directory exists) with the supplied commit logs.
    pub fn extract(&self, logs: &[CommitLog]) -> Result<SectionMap> {
        let mut sections = SectionMap::new();

        if self.release_notes.is_dir() {
            self.extract_release_notes(&mut sections)?;
        }

        self.extract_commit_logs(&mut sections, logs)?;

        Ok(sections)
    }

    /// Read legacy `<issue_ref>.<type>[!]` note files. Unregistered types and
    /// malformed filenames fail the extraction with a typed error.
    fn extract_release_notes(&self, sections: &mut SectionMap) -> Result<()> {
        warn!("extracting release note changes");

        for (name, path) in note_files(&self.release_notes)? {
            let (issue_ref, type_token) =
                name.split_once('.').ok_or_else(|| {
                    ChangelogError::invalid_note(
                        &name,
                        "expected '<issue_ref>.<type>' filename",
                    )
                })?;

            let (type_token, breaking) = match type_token.strip_suffix('!') {
                Some(token) => (token, true),
                None => (type_token, false),
            };

            let commit_type =
                self.registry.get(type_token).ok_or_else(|| {
                    ChangelogError::invalid_note(
                        &name,
                        format!("unsupported commit type '{}'", type_token),
                    )
                })?;

            let description = fs::read_to_string(&path)?.trim().to_string();

            if breaking {
                info!(
                    "  breaking change detected: {}: {}",
                    commit_type.name, description
                );
            }

            sections
                .entry(commit_type.header.clone())
                .or_default()
                .insert(
                    issue_ref.to_string(),
                    Change {
                        issue_ref: issue_ref.to_string(),
                        description,
                        commit_type: commit_type.name.clone(),
                        scope: None,
                        breaking,
                        authors: None,
                        short_hash: None,
                        commit_hash: None,
                    },
                );
        }

        Ok(())
    }

    /// Parse conventional commit messages against a pattern built from the
    /// registry's type tokens. Non-matching messages, including messages with
    /// unregistered types, are skipped.
    fn extract_commit_logs(
        &self,
        sections: &mut SectionMap,
        logs: &[CommitLog],
    ) -> Result<()> {
        let pattern = self.commit_pattern()?;

        warn!("extracting commit log changes");

        for (i, log) in logs.iter().enumerate() {
            let Some(caps) = pattern.captures(&log.message) else {
                debug!(
                    "  skipping commit log (not conventional): {}",
                    log.message.trim()
                );
                continue;
            };

            debug!("  parsing commit log: {}", log.message.trim());

            let commit_type = caps[1].to_string();
            let scope = caps.get(2).map(|m| m.as_str().to_string());
            let description = caps[4].trim().to_string();
            let details = caps.get(5).map(|m| m.as_str()).unwrap_or("");
            let breaking = caps.get(3).is_some()
                || details.contains("BREAKING CHANGE");

            if breaking {
                info!(
                    "  breaking change detected: {}: {}",
                    commit_type, description
                );
            }

            let mut change = Change {
                issue_ref: format!("__{}__", i),
                description,
                commit_type: commit_type.clone(),
                scope,
                breaking,
                authors: None,
                short_hash: Some(log.short_hash.clone()),
                commit_hash: Some(log.hash.clone()),
            };

            for line in details.lines() {
                if let Some(caps) = REFS_REGEX.captures(line) {
                    debug!("  'Refs' footer extracted '{}'", &caps[1]);
                    change.issue_ref = caps[1].to_string();
                }
                if let Some(caps) = AUTHORS_REGEX.captures(line) {
                    debug!("  'Authors' footer extracted '{}'", &caps[1]);
                    change.authors = Some(caps[1].trim().to_string());
                }
            }

            // the pattern only matches registered types
            let Some(commit_type) = self.registry.get(&commit_type) else {
                continue;
            };

            sections
                .entry(commit_type.header.clone())
                .or_default()
                .insert(change.issue_ref.clone(), change);
        }

        Ok(())
    }

    /// Conventional commit pattern built from registered type tokens:
    /// `<type>[(<scope>)][!]: <subject>` with an optional free-text body.
    fn commit_pattern(&self) -> Result<Regex> {
        let types = self.registry.types_pattern();
        Ok(Regex::new(&format!(
            r"^({})(\([\w\-\.]+\))?(!)?: ([^\n]+)([\s\S]*)",
            types
        ))?)
    }

    /// Sorted set of distinct non-placeholder issue refs across registered
    /// sections. This is the fan-out list for per-issue post-processing.
    pub fn unique_issues(&self, sections: &SectionMap) -> Vec<String> {
        let mut refs: Vec<String> = sections
            .values()
            .flat_map(|changes| changes.values())
            .filter(|c| {
                self.registry.contains(&c.commit_type)
                    && !c.is_placeholder_ref()
            })
            .map(|c| c.issue_ref.clone())
            .collect();

        refs.sort();
        refs.dedup();
        refs
    }

    /// Remove parsed release note files. No-op under dry-run since nothing
    /// has been durably written yet; safe on an absent or already-cleaned
    /// directory.
    pub fn clean(&self) -> Result<()> {
        if !self.release_notes.is_dir() {
            return Ok(());
        }

        info!("cleaning release notes");

        for (name, path) in note_files(&self.release_notes)? {
            if self.dry_run {
                info!("  would remove release note '{}'", name);
                continue;
            }
            fs::remove_file(&path)?;
        }

        Ok(())
    }
}

/// Non-dotfile entries of the release notes directory in filename order.
fn note_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = vec![];

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with('.') || !entry.file_type()?.is_file() {
            continue;
        }

        files.push((name, entry.path()));
    }

    files.sort();

    Ok(files)
}

/// Walk the merged sections and decide the minimal semver bump: start at
/// patch, raise to each record's configured weight when it outranks, and
/// force major the moment any breaking record is seen.
pub fn resolve_semver(
    sections: &SectionMap,
    registry: &TypeRegistry,
) -> SemverWeight {
    warn!("detecting semver from changes");

    let mut weight = SemverWeight::Patch;

    for changes in sections.values() {
        for change in changes.values() {
            let configured = registry.weight_for(&change.commit_type);

            if configured > weight {
                weight = configured;
                info!(
                    "  '{}' change detected from commit_type '{}'",
                    weight, change.commit_type
                );
            }

            if change.breaking && weight != SemverWeight::Major {
                weight = SemverWeight::Major;
                info!(
                    "  '{}' change detected from breaking issue '{}'",
                    weight, change.issue_ref
                );
            }
        }
    }

    weight
}

/// Resolve the next version string from the merged sections. On a pre-1.0
/// current version the resolved weight is downgraded one step, so breaking
/// or feature changes do not yet warrant a major/minor bump.
pub fn extract_version_tag(
    sections: &SectionMap,
    registry: &TypeRegistry,
    provider: &dyn VersionProvider,
) -> Result<String> {
    let mut weight = resolve_semver(sections, registry);

    let info = provider.get_version_info(SemverWeight::Patch)?;
    let current = semver::Version::parse(&info.current)?;

    if current.major == 0 && weight != SemverWeight::Patch {
        let downgraded = weight.downgrade();
        info!(
            "  '{}' change downgraded to '{}' for 0.x release",
            weight, downgraded
        );
        weight = downgraded;
    }

    Ok(provider.get_version_info(weight)?.new)
}

/// Sections grouped by header in registry order, records pre-sorted for
/// display. This is the shape handed to the changelog writers.
pub fn grouped_sections(
    sections: &SectionMap,
    registry: &TypeRegistry,
) -> Vec<(String, Vec<Change>)> {
    let mut groups: Vec<(String, Vec<Change>)> = vec![];

    for entry in registry.iter() {
        // multiple types may share a header; render it once
        if groups.iter().any(|(header, _)| *header == entry.header) {
            continue;
        }

        if let Some(changes) = sections.get(&entry.header) {
            let mut changes: Vec<Change> =
                changes.values().cloned().collect();
            sort_changes(&mut changes);
            groups.push((entry.header.clone(), changes));
        }
    }

    groups
}

#[cfg(test)]
#[path = "./extractor_tests.rs"]
mod tests;
