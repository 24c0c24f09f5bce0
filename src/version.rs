//! External version-bump tool collaborator.
//!
//! The concrete next version number is never computed here: an external bump
//! tool owns version arithmetic and the version files it rewrites. Which
//! tool flavor to invoke is an explicit configuration value.
use log::*;
use std::process::Command;

use crate::{
    config::{BumpTool, SemverWeight},
    error::{ChangelogError, Result},
};

#[cfg(test)]
use mockall::automock;

/// Version info reported by the bump tool for a given semver weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub current: String,
    pub new: String,
}

/// Collaborator that computes and applies concrete version numbers.
#[cfg_attr(test, automock)]
pub trait VersionProvider {
    /// Probe the tool without side effects: the current version and the
    /// version a `weight` bump would produce.
    fn get_version_info(&self, weight: SemverWeight) -> Result<VersionInfo>;

    /// Apply the bump for `version`.
    fn release(&self, version: &str) -> Result<()>;
}

/// Version provider backed by an external bump tool subprocess.
pub struct BumpCommand {
    tool: BumpTool,
    allow_dirty: bool,
    dry_run: bool,
}

impl BumpCommand {
    pub fn new(tool: BumpTool, allow_dirty: bool, dry_run: bool) -> Self {
        Self {
            tool,
            allow_dirty,
            dry_run,
        }
    }

    fn version_info_args(&self, weight: SemverWeight) -> Vec<String> {
        match self.tool {
            BumpTool::BumpMyVersion => {
                vec!["bump-my-version", "show-bump", "--ascii"]
                    .into_iter()
                    .map(String::from)
                    .collect()
            }
            BumpTool::Bump2version => vec![
                "bumpversion".to_string(),
                weight.as_str().to_string(),
                "--dry-run".to_string(),
                "--list".to_string(),
                "--allow-dirty".to_string(),
            ],
        }
    }

    fn release_args(&self, version: &str) -> Vec<String> {
        let command = match self.tool {
            BumpTool::BumpMyVersion => "bump-my-version",
            BumpTool::Bump2version => "bumpversion",
        };

        let mut args = match self.tool {
            BumpTool::BumpMyVersion => vec![
                command.to_string(),
                "bump".to_string(),
                "patch".to_string(),
            ],
            BumpTool::Bump2version => {
                vec![command.to_string(), "patch".to_string()]
            }
        };

        args.push("--new-version".to_string());
        args.push(version.to_string());

        if self.dry_run {
            args.push("--dry-run".to_string());
        }

        if self.allow_dirty {
            args.push("--allow-dirty".to_string());
        }

        args
    }

    /// Run the tool and return its output lines.
    fn run(&self, args: &[String]) -> Result<Vec<String>> {
        debug!("running bump tool: {}", args.join(" "));

        let output = Command::new(&args[0])
            .args(&args[1..])
            .output()
            .map_err(|e| {
                ChangelogError::version_detection(format!(
                    "failed to run '{}': {}",
                    args[0], e
                ))
            })?;

        if !output.status.success() {
            for line in String::from_utf8_lossy(&output.stderr).lines() {
                warn!("{}", line.trim());
            }
            return Err(ChangelogError::version_detection(format!(
                "'{}' exited with {}",
                args[0], output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .trim()
            .lines()
            .map(String::from)
            .collect())
    }
}

impl VersionProvider for BumpCommand {
    fn get_version_info(&self, weight: SemverWeight) -> Result<VersionInfo> {
        let lines = self.run(&self.version_info_args(weight))?;

        match self.tool {
            BumpTool::BumpMyVersion => {
                parse_bump_my_version_info(weight, &lines)
            }
            BumpTool::Bump2version => parse_bump2version_info(&lines),
        }
    }

    fn release(&self, version: &str) -> Result<()> {
        let lines = self.run(&self.release_args(version))?;

        for line in lines {
            warn!("{}", line);
        }

        Ok(())
    }
}

/// Parse output from the bump-my-version show-bump command, e.g.
///
/// ```text
/// 0.1.2 -- bump -+- major -- 1.0.0
///                +- minor -- 0.2.0
///                +- patch -- 0.1.3
/// ```
fn parse_bump_my_version_info(
    weight: SemverWeight,
    lines: &[String],
) -> Result<VersionInfo> {
    let pattern =
        regex::Regex::new(&format!(r".*({}) [-]+ (.*)", weight.as_str()))?;

    let current = lines
        .first()
        .and_then(|line| line.split(" -- ").next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ChangelogError::version_detection(
                "no current version in show-bump output",
            )
        })?;

    let new = lines
        .iter()
        .find_map(|line| pattern.captures(line))
        .map(|caps| caps[2].trim().to_string())
        .ok_or_else(|| {
            ChangelogError::version_detection(format!(
                "no '{}' bump in show-bump output",
                weight
            ))
        })?;

    Ok(VersionInfo { current, new })
}

/// Parse output from the bump2version `--dry-run --list` command, which
/// reports `current_version=...` and `new_version=...` lines.
fn parse_bump2version_info(lines: &[String]) -> Result<VersionInfo> {
    let mut current = None;
    let mut new = None;

    for line in lines {
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "current_version" => current = Some(value.trim().to_string()),
                "new_version" => new = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    match (current, new) {
        (Some(current), Some(new)) => Ok(VersionInfo { current, new }),
        _ => Err(ChangelogError::version_detection(
            "missing current_version/new_version in bumpversion output",
        )),
    }
}
