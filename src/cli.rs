//! CLI argument parsing.
use clap::{Parser, Subcommand};

use crate::writer::Extension;

/// Global CLI arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Changelog operation subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty CHANGELOG file.
    Init(InitArgs),

    /// Generate a changelog entry from pending changes.
    Generate(GenerateArgs),
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    #[arg(long, value_enum, default_value = "md")]
    /// Changelog file format to create.
    pub file_format: Extension,
}

#[derive(Parser, Debug, Default)]
pub struct GenerateArgs {
    #[arg(long)]
    /// Version to release, skipping version resolution.
    pub version_tag: Option<String>,

    #[arg(long, default_value_t = false)]
    /// Preview the changelog entry without writing anything.
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    /// Proceed even when the working tree is dirty.
    pub allow_dirty: bool,

    #[arg(long, default_value_t = false)]
    /// Tag the release with the bump tool after writing.
    pub release: bool,

    #[arg(long, default_value_t = false)]
    /// Commit the changelog after writing.
    pub commit: bool,

    #[arg(long, default_value_t = false)]
    /// Fail when no pending changes are found.
    pub reject_empty: bool,

    #[arg(long)]
    /// strftime format appended to the version heading.
    pub date_format: Option<String>,

    #[arg(long)]
    /// Rest API endpoint for per-issue notifications.
    pub post_process_url: Option<String>,

    #[arg(long)]
    /// Environment variable holding post-process auth content.
    pub post_process_auth_env: Option<String>,
}
