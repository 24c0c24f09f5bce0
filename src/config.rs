//! Configuration loading and parsing for `changelog.toml` files.
//!
//! Configuration is layered and resolved once at startup: CLI flags override
//! file values, which override defaults. The commit-type registry is an
//! ordered array of tables so section order in the rendered changelog follows
//! the configuration.
use serde::Deserialize;
use std::{collections::HashMap, fmt, fs, path::Path, sync::LazyLock};

use crate::{
    cli::GenerateArgs,
    error::{ChangelogError, Result},
};

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "changelog.toml";

/// Semantic version bump weights ordered by impact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SemverWeight {
    Patch,
    Minor,
    Major,
}

impl SemverWeight {
    /// Step down one level in `[patch, minor, major]`; patch stays patch.
    pub fn downgrade(self) -> Self {
        match self {
            SemverWeight::Major => SemverWeight::Minor,
            SemverWeight::Minor => SemverWeight::Patch,
            SemverWeight::Patch => SemverWeight::Patch,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SemverWeight::Patch => "patch",
            SemverWeight::Minor => "minor",
            SemverWeight::Major => "major",
        }
    }
}

impl fmt::Display for SemverWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One commit-type registry entry: maps a type token to its changelog
/// section header and semver weight.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitType {
    /// Type token, e.g. "feat".
    pub name: String,
    /// Changelog section header this type renders under.
    pub header: String,
    /// Bump weight this type implies.
    #[serde(default = "default_weight")]
    pub semver: SemverWeight,
}

fn default_weight() -> SemverWeight {
    SemverWeight::Patch
}

static TOKEN_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Ordered commit-type registry, read-only during a run.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    entries: Vec<CommitType>,
}

impl TypeRegistry {
    /// Build a registry, validating that every type token is an
    /// identifier-safe, unique string before it is ever compiled into the
    /// commit match pattern.
    pub fn new(entries: Vec<CommitType>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ChangelogError::invalid_config(
                "commit-type registry is empty",
            ));
        }

        for (i, entry) in entries.iter().enumerate() {
            if !TOKEN_REGEX.is_match(&entry.name) {
                return Err(ChangelogError::invalid_config(format!(
                    "commit type '{}' is not a valid token",
                    entry.name
                )));
            }

            if entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(ChangelogError::invalid_config(format!(
                    "duplicate commit type '{}'",
                    entry.name
                )));
            }
        }

        Ok(Self { entries })
    }

    /// Look up a registry entry by type token.
    pub fn get(&self, name: &str) -> Option<&CommitType> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Configured weight for a type token; unregistered types weigh patch.
    pub fn weight_for(&self, name: &str) -> SemverWeight {
        self.get(name).map(|e| e.semver).unwrap_or(SemverWeight::Patch)
    }

    /// Registry entries in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommitType> {
        self.entries.iter()
    }

    /// Alternation of all type tokens for the conventional commit pattern.
    pub fn types_pattern(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

fn default_commit_types() -> Vec<CommitType> {
    [
        ("feat", "Features and Improvements", SemverWeight::Minor),
        ("fix", "Bug fixes", SemverWeight::Patch),
        ("bug", "Bug fixes", SemverWeight::Patch),
        ("docs", "Documentation", SemverWeight::Patch),
        ("chore", "Miscellaneous", SemverWeight::Patch),
        ("ci", "Miscellaneous", SemverWeight::Patch),
        ("perf", "Miscellaneous", SemverWeight::Patch),
        ("refactor", "Miscellaneous", SemverWeight::Patch),
        ("revert", "Miscellaneous", SemverWeight::Patch),
        ("style", "Miscellaneous", SemverWeight::Patch),
        ("test", "Miscellaneous", SemverWeight::Patch),
    ]
    .into_iter()
    .map(|(name, header, semver)| CommitType {
        name: name.to_string(),
        header: header.to_string(),
        semver,
    })
    .collect()
}

/// Which external version-bump tool to invoke. An explicit configuration
/// value, never probed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum BumpTool {
    #[default]
    #[serde(rename = "bump-my-version")]
    BumpMyVersion,
    #[serde(rename = "bump2version")]
    Bump2version,
}

/// Version provider settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    /// External bump tool flavor.
    pub tool: BumpTool,
}

/// Post-processing request auth schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Basic,
    Bearer,
}

/// Per-issue notification settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Rest API endpoint, may contain `::issue_ref::` and `::version::`.
    pub url: String,
    /// HTTP verb to use.
    pub verb: String,
    /// Request body template.
    pub body: String,
    /// Auth scheme for the value read from `auth_env`.
    pub auth_type: AuthType,
    /// Name of an environment variable holding the auth content. For basic
    /// auth the variable should contain "{username}:{api_key}".
    pub auth_env: Option<String>,
    /// Extra request headers.
    pub headers: HashMap<String, String>,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            verb: "POST".to_string(),
            body: r#"{"body": "Released on ::version::"}"#.to_string(),
            auth_type: AuthType::default(),
            auth_env: None,
            headers: HashMap::new(),
        }
    }
}

/// Root configuration structure for `changelog.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Issue link template, may contain `::issue_ref::`.
    pub issue_link: Option<String>,
    /// Commit link template, may contain `::commit_hash::`.
    pub commit_link: Option<String>,
    /// strftime format appended to the version heading.
    pub date_format: Option<String>,
    /// Version heading template, `::version::` is the new version.
    pub version_string: String,
    /// Branches generation is allowed on; empty allows all.
    pub allowed_branches: Vec<String>,
    /// Commit-type registry entries in section order.
    #[serde(rename = "commit_type")]
    pub commit_types: Vec<CommitType>,
    /// Tag the release with the bump tool after writing.
    pub release: bool,
    /// Commit the changelog after writing.
    pub commit: bool,
    /// Allow generation on a dirty working tree.
    pub allow_dirty: bool,
    /// Fail when no changes are found.
    pub reject_empty: bool,
    /// Version provider settings.
    pub version: VersionConfig,
    /// Per-issue notification settings.
    pub post_process: Option<PostProcessConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issue_link: None,
            commit_link: None,
            date_format: None,
            version_string: "v::version::".to_string(),
            allowed_branches: vec![],
            commit_types: default_commit_types(),
            release: false,
            commit: false,
            allow_dirty: false,
            reject_empty: false,
            version: VersionConfig::default(),
            post_process: None,
        }
    }
}

impl Config {
    /// Build the validated commit-type registry from configured entries.
    pub fn registry(&self) -> Result<TypeRegistry> {
        TypeRegistry::new(self.commit_types.clone())
    }

    /// Apply CLI overrides on top of file values. Boolean flags only ever
    /// enable behavior, they never reset a file value.
    pub fn apply_overrides(&mut self, args: &GenerateArgs) {
        self.release = self.release || args.release;
        self.commit = self.commit || args.commit;
        self.allow_dirty = self.allow_dirty || args.allow_dirty;
        self.reject_empty = self.reject_empty || args.reject_empty;

        if let Some(fmt) = &args.date_format {
            self.date_format = Some(fmt.clone());
        }

        if args.post_process_url.is_some()
            || args.post_process_auth_env.is_some()
        {
            let mut post_process =
                self.post_process.take().unwrap_or_default();

            if let Some(url) = &args.post_process_url {
                post_process.url = url.clone();
            }

            if let Some(auth_env) = &args.post_process_auth_env {
                post_process.auth_env = Some(auth_env.clone());
            }

            self.post_process = Some(post_process);
        }
    }
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!(
            "no config file at '{}', using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
