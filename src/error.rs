//! Typed error handling for changelog-gen.

use thiserror::Error;

/// Main error type for changelog-gen operations.
#[derive(Error, Debug)]
pub enum ChangelogError {
    // Extraction errors
    #[error("Invalid release note './release_notes/{file}': {reason}")]
    InvalidReleaseNote { file: String, reason: String },

    #[error("No changes detected since the last release")]
    NoChanges,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Changelog file errors
    #[error("CHANGELOG.{0} already exists")]
    ChangelogExists(String),

    #[error("No CHANGELOG file detected, run `changelog init`")]
    NoChangelogFile,

    // Git errors
    #[error("Git operation failed: {0}")]
    Vcs(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    // Version provider errors
    #[error("Unable to get version data from bump tool: {0}")]
    VersionDetection(String),

    // Network errors
    #[error("Network request failed: {0}")]
    Network(String),

    // Parsing errors - automatic conversions via #[from]
    #[error("Invalid version format: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Regular expression error: {0}")]
    Regex(#[from] regex::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Logger initialization error: {0}")]
    Logger(#[from] log::SetLoggerError),

    // Generic wrapper for other errors
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

/// Result type alias using ChangelogError
pub type Result<T> = std::result::Result<T, ChangelogError>;

impl ChangelogError {
    /// Create an invalid release note error naming the offending file.
    pub fn invalid_note(
        file: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidReleaseNote {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a vcs error with context
    pub fn vcs(msg: impl Into<String>) -> Self {
        Self::Vcs(msg.into())
    }

    /// Create a version detection error
    pub fn version_detection(msg: impl Into<String>) -> Self {
        Self::VersionDetection(msg.into())
    }
}

// Implement From for std::io::Error - wraps in Other variant for generic I/O errors
impl From<std::io::Error> for ChangelogError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(color_eyre::Report::from(err))
    }
}

// Implement From for reqwest errors (post-processing requests)
impl From<reqwest::Error> for ChangelogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
