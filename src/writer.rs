//! Changelog rendering for Markdown and RST files.
use clap::ValueEnum;
use log::*;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{config::Config, error::Result, extractor::Change};

/// Supported changelog file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Extension {
    Md,
    Rst,
}

impl Extension {
    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Md => "md",
            Extension::Rst => "rst",
        }
    }

    /// Detect an existing CHANGELOG file in `root`.
    pub fn detect(root: &Path) -> Option<Extension> {
        [Extension::Md, Extension::Rst]
            .into_iter()
            .find(|ext| changelog_path(root, *ext).exists())
    }
}

/// Path of the changelog file for an extension.
pub fn changelog_path(root: &Path, extension: Extension) -> PathBuf {
    root.join(format!("CHANGELOG.{}", extension.as_str()))
}

/// Renderer for one changelog flavor. Groups arrive in registry order with
/// records pre-sorted for display.
pub trait Writer {
    /// Header written at the top of every changelog file.
    fn file_header(&self) -> &'static str;

    /// Number of lines the file header occupies, used to strip it from
    /// existing content when merging.
    fn header_line_count(&self) -> usize;

    /// Render the entry for a new version.
    fn render(
        &mut self,
        version: &str,
        groups: &[(String, Vec<Change>)],
    ) -> String;

    /// Merge a rendered entry above existing changelog content, below the
    /// file header.
    fn merge_with_existing(
        &self,
        entry: &str,
        existing: Option<&str>,
    ) -> String {
        merge_parts(
            self.file_header(),
            self.header_line_count(),
            entry,
            existing,
        )
    }
}

fn merge_parts(
    file_header: &str,
    header_line_count: usize,
    entry: &str,
    existing: Option<&str>,
) -> String {
    let mut content = format!("{}{}\n", file_header, entry.trim_end());

    if let Some(existing) = existing {
        let tail = existing
            .lines()
            .skip(header_line_count)
            .collect::<Vec<_>>()
            .join("\n");

        if !tail.trim().is_empty() {
            content.push('\n');
            content.push_str(tail.trim_end());
            content.push('\n');
        }
    }

    content
}

/// Scope, breaking marker and authors folded into the display description.
fn describe(change: &Change, bold: impl Fn(&str) -> String) -> String {
    let mut description = match &change.scope {
        Some(scope) => format!("{} {}", scope, change.description),
        None => change.description.clone(),
    };

    if change.breaking {
        description = format!("{} {}", bold("Breaking:"), description);
    }

    if let Some(authors) = &change.authors {
        description = format!("{} {}", description, authors);
    }

    description
}

/// Markdown writer implementation.
pub struct MdWriter {
    issue_link: Option<String>,
    commit_link: Option<String>,
}

impl MdWriter {
    pub fn new(config: &Config) -> Self {
        Self {
            issue_link: config.issue_link.clone(),
            commit_link: config.commit_link.clone(),
        }
    }

    fn change_line(&self, change: &Change) -> String {
        let description = describe(change, |s| format!("**{}**", s));

        // placeholder refs never render as issue links
        let mut line = if change.is_placeholder_ref() {
            format!("- {}", description)
        } else if let Some(link) = &self.issue_link {
            format!("- {} [[#{}]({})]", description, change.issue_ref, link)
        } else {
            format!("- {} [#{}]", description, change.issue_ref)
        };

        if let (Some(link), Some(hash)) =
            (&self.commit_link, &change.commit_hash)
        {
            let short = change.short_hash.as_deref().unwrap_or(hash);
            line = format!("{} [[{}]({})]", line, short, link);
        }

        line.replace("::issue_ref::", &change.issue_ref).replace(
            "::commit_hash::",
            change.commit_hash.as_deref().unwrap_or(""),
        )
    }
}

impl Writer for MdWriter {
    fn file_header(&self) -> &'static str {
        "# Changelog\n\n"
    }

    fn header_line_count(&self) -> usize {
        2
    }

    fn render(
        &mut self,
        version: &str,
        groups: &[(String, Vec<Change>)],
    ) -> String {
        let mut content = vec![format!("## {}", version), String::new()];

        for (header, changes) in groups {
            content.push(format!("### {}", header));
            content.push(String::new());

            for change in changes {
                content.push(self.change_line(change));
            }

            content.push(String::new());
        }

        content.join("\n")
    }
}

/// RST writer implementation. Link targets are collected while rendering and
/// emitted at the end of the file.
pub struct RstWriter {
    issue_link: Option<String>,
    commit_link: Option<String>,
    links: BTreeMap<String, String>,
}

impl RstWriter {
    pub fn new(config: &Config) -> Self {
        Self {
            issue_link: config.issue_link.clone(),
            commit_link: config.commit_link.clone(),
            links: BTreeMap::new(),
        }
    }

    fn change_line(&mut self, change: &Change) -> String {
        let description = describe(change, |s| format!("**{}**", s));

        let mut line = if change.is_placeholder_ref() {
            format!("* {}", description)
        } else if let Some(link) = &self.issue_link {
            self.links.insert(
                format!("#{}", change.issue_ref),
                link.replace("::issue_ref::", &change.issue_ref),
            );
            format!("* {} [`#{}`_]", description, change.issue_ref)
        } else {
            format!("* {} [#{}]", description, change.issue_ref)
        };

        if let (Some(link), Some(hash)) =
            (&self.commit_link, &change.commit_hash)
        {
            let short =
                change.short_hash.clone().unwrap_or_else(|| hash.clone());
            self.links
                .insert(short.clone(), link.replace("::commit_hash::", hash));
            line = format!("{} [`{}`_]", line, short);
        }

        line
    }
}

impl Writer for RstWriter {
    fn file_header(&self) -> &'static str {
        "=========\nChangelog\n=========\n\n"
    }

    fn header_line_count(&self) -> usize {
        4
    }

    fn render(
        &mut self,
        version: &str,
        groups: &[(String, Vec<Change>)],
    ) -> String {
        let mut content =
            vec![version.to_string(), "=".repeat(version.chars().count())];
        content.push(String::new());

        for (header, changes) in groups {
            content.push(header.clone());
            content.push("-".repeat(header.chars().count()));
            content.push(String::new());

            for change in changes {
                content.push(self.change_line(change));
                content.push(String::new());
            }
        }

        content.join("\n")
    }

    fn merge_with_existing(
        &self,
        entry: &str,
        existing: Option<&str>,
    ) -> String {
        let mut content = merge_parts(
            self.file_header(),
            self.header_line_count(),
            entry,
            existing,
        );

        if !self.links.is_empty() {
            content.push('\n');
            for (name, target) in &self.links {
                content.push_str(&format!(".. _`{}`: {}\n", name, target));
            }
        }

        content
    }
}

/// Generate a writer for the required extension.
pub fn new_writer(extension: Extension, config: &Config) -> Box<dyn Writer> {
    match extension {
        Extension::Md => Box::new(MdWriter::new(config)),
        Extension::Rst => Box::new(RstWriter::new(config)),
    }
}

/// Write the merged changelog content, or log it under dry-run.
pub fn write_changelog(path: &Path, content: &str, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("would write to '{}'", path.display());
        return Ok(());
    }

    warn!("writing to '{}'", path.display());
    fs::write(path, content)?;

    Ok(())
}
