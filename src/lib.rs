pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod extractor;
pub mod post_processor;
pub mod vcs;
pub mod version;
pub mod writer;

pub use error::{ChangelogError, Result};
