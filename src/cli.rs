//! Command-line interface definitions for dupescout.
//!
//! # Example
//!
//! ```bash
//! # List duplicates under two directories
//! dupescout ~/Pictures /mnt/backup/Pictures
//!
//! # Stream duplicates as they are found, hashing whole files
//! dupescout --stream --key full ~/Downloads
//!
//! # Only photos, skipping thumbnails, as JSON
//! dupescout --ext jpg --ext png --exclude-dir .thumbnails --output json ~/Pictures
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Settings;
use crate::scanner::KeyStrategy;

/// Concurrent duplicate file finder.
///
/// Walks each PATH, computes a content key for every non-empty file and
/// reports the files whose keys collide.
#[derive(Debug, Parser)]
#[command(name = "dupescout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to search (default: settings file roots, else ".")
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Settings file (TOML)
    #[arg(long, value_name = "FILE", env = "DUPESCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Include hidden files and directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Directory to prune (repeatable, matches trailing path components)
    #[arg(short = 'x', long = "exclude-dir", value_name = "DIR")]
    pub exclude_dirs: Vec<String>,

    /// Only search files with this extension (repeatable)
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Content key strategy
    #[arg(short, long, value_enum)]
    pub key: Option<KeyStrategy>,

    /// Concurrent key generations (0 = one per CPU)
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Print duplicates as they are found instead of after the search
    #[arg(long)]
    pub stream: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Report errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

impl Cli {
    /// Overlay CLI flags on loaded settings.
    ///
    /// Paths replace configured roots; exclusions and extensions extend
    /// the configured lists.
    pub fn apply_to(&self, settings: &mut Settings) {
        if !self.paths.is_empty() {
            settings.roots = self.paths.clone();
        }
        if self.include_hidden {
            settings.filters.include_hidden = true;
        }
        settings
            .filters
            .exclude_dirs
            .extend(self.exclude_dirs.iter().cloned());
        settings
            .filters
            .include_exts
            .extend(self.extensions.iter().cloned());
        if let Some(key) = self.key {
            settings.key = key;
        }
        if let Some(workers) = self.workers {
            settings.workers = i64::try_from(workers).unwrap_or(0);
        }
    }
}

/// Output format for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One path per line
    Text,
    /// JSON document (batch) or one JSON object per line (stream)
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
