//! Command execution and orchestration.
//!
//! Each subcommand has its own module with an `execute` entry point taking
//! its parsed CLI arguments. The generation workflow is strictly sequential:
//! validate repository state, extract pending changes, resolve the next
//! version, render and merge the changelog, then run the side effects
//! (cleanup, commit, release, per-issue notifications).

/// Changelog entry generation.
pub mod generate;

/// CHANGELOG file creation.
pub mod init;
