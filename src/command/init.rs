//! CHANGELOG initialization command implementation.
use log::*;
use std::{env, fs, path::Path};

use crate::{
    cli::InitArgs,
    config::Config,
    error::{ChangelogError, Result},
    writer::{self, Extension},
};

pub fn execute(args: &InitArgs) -> Result<()> {
    let root = env::current_dir()?;
    init(&root, args.file_format)
}

/// Create an empty changelog file containing only the file header. Fails when
/// a changelog of any supported format already exists.
pub fn init(root: &Path, extension: Extension) -> Result<()> {
    if let Some(existing) = Extension::detect(root) {
        return Err(ChangelogError::ChangelogExists(
            existing.as_str().to_string(),
        ));
    }

    let path = writer::changelog_path(root, extension);
    let writer = writer::new_writer(extension, &Config::default());

    fs::write(&path, writer.file_header())?;

    info!("created '{}'", path.display());

    Ok(())
}
