//! Changelog generation command implementation.
use chrono::Local;
use log::*;
use std::{env, fs, path::Path};

use crate::{
    cli::GenerateArgs,
    config::{self, Config, SemverWeight},
    error::{ChangelogError, Result},
    extractor::{self, Extractor},
    post_processor,
    vcs::Repo,
    version::{BumpCommand, VersionProvider},
    writer::{self, Extension},
};

pub fn execute(args: &GenerateArgs) -> Result<()> {
    let root = env::current_dir()?;

    let mut config =
        config::load(&root.join(config::DEFAULT_CONFIG_FILE))?;
    config.apply_overrides(args);

    let provider = BumpCommand::new(
        config.version.tool,
        config.allow_dirty,
        args.dry_run,
    );

    generate(&root, &config, &provider, args)
}

/// Run the generation pipeline: validate repository state, extract pending
/// changes, resolve the next version, render and merge the changelog, then
/// clean up and run the configured side effects.
pub fn generate(
    root: &Path,
    config: &Config,
    provider: &dyn VersionProvider,
    args: &GenerateArgs,
) -> Result<()> {
    let registry = config.registry()?;

    let extension =
        Extension::detect(root).ok_or(ChangelogError::NoChangelogFile)?;

    let repo = Repo::open(root, config.commit, args.dry_run)?;

    check_repo_state(&repo, config, args)?;

    let extractor = Extractor::new(root, &registry, args.dry_run);

    let current = provider.get_version_info(SemverWeight::Patch)?.current;
    let tag = repo.find_tag(&current)?;
    let logs = repo.commits_since(tag.as_deref())?;

    let sections = extractor.extract(&logs)?;

    if sections.is_empty() {
        if config.reject_empty {
            return Err(ChangelogError::NoChanges);
        }

        info!("no changes detected, nothing to do");
        return Ok(());
    }

    let version_tag = match &args.version_tag {
        Some(tag) => tag.clone(),
        None => extractor::extract_version_tag(
            &sections, &registry, provider,
        )?,
    };

    let mut version_string =
        config.version_string.replace("::version::", &version_tag);

    if let Some(date_format) = &config.date_format {
        if !date_format.is_empty() {
            version_string = format!(
                "{} {}",
                version_string,
                Local::now().format(date_format)
            );
        }
    }

    let groups = extractor::grouped_sections(&sections, &registry);

    let mut writer = writer::new_writer(extension, config);
    let entry = writer.render(&version_string, &groups);

    // preview for the user, independent of log level
    println!("{}", entry);

    let path = writer::changelog_path(root, extension);
    let existing = match path.exists() {
        true => Some(fs::read_to_string(&path)?),
        false => None,
    };

    let content = writer.merge_with_existing(&entry, existing.as_deref());

    writer::write_changelog(&path, &content, args.dry_run)?;

    extractor.clean()?;

    if config.commit {
        let changelog = format!("CHANGELOG.{}", extension.as_str());
        let mut paths = vec![Path::new(changelog.as_str())];

        if root.join("release_notes").is_dir() {
            paths.push(Path::new("release_notes"));
        }

        repo.commit(&version_tag, &paths)?;
    }

    if config.release {
        warn!("releasing version {}", version_tag);
        provider.release(&version_tag)?;
    }

    if let Some(post_process) = &config.post_process {
        let issues = extractor.unique_issues(&sections);
        post_processor::per_issue_post_process(
            post_process,
            &issues,
            &version_tag,
            args.dry_run,
        )?;
    }

    Ok(())
}

/// Refuse to run on a dirty working tree (unless allowed or previewing) or on
/// a branch outside the configured allow-list.
fn check_repo_state(
    repo: &Repo,
    config: &Config,
    args: &GenerateArgs,
) -> Result<()> {
    let info = repo.current_info()?;

    if info.dirty && !config.allow_dirty && !args.dry_run {
        return Err(ChangelogError::vcs(
            "working directory is not clean, use `--allow-dirty` to ignore",
        ));
    }

    if !config.allowed_branches.is_empty()
        && !config.allowed_branches.contains(&info.branch)
    {
        return Err(ChangelogError::vcs(format!(
            "generating changelog is not allowed on branch '{}'",
            info.branch
        )));
    }

    Ok(())
}
