//! Depth-first directory walker using walkdir.
//!
//! # Overview
//!
//! [`TreeWalker`] traverses one root and hands every accepted file to a
//! caller-supplied scheduling closure. The duplicate finder uses that closure
//! to submit key-generation work to the worker pool.
//!
//! # Features
//!
//! - Deterministic order (children sorted by file name)
//! - Directory pruning and file skipping via [`PathFilter`]
//! - Zero-size and non-regular files are skipped
//! - Symlinks are never followed
//! - Cooperative shutdown checked before every entry
//!
//! Any traversal error aborts the walk and is returned to the caller.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{PathFilter, ScanError};
use crate::signal::ShutdownHandler;

/// Drop roots that repeat or lie inside another root.
///
/// Roots are compared by canonical path. A root that cannot be resolved is
/// always kept so the walk reports it. Survivors keep their original
/// spelling and order.
///
/// # Example
///
/// ```no_run
/// use dupescout::scanner::distinct_roots;
/// use std::path::PathBuf;
///
/// let roots = vec![
///     PathBuf::from("/srv/photos"),
///     PathBuf::from("/srv/photos/2024"),
///     PathBuf::from("/srv/photos/"),
/// ];
/// assert_eq!(distinct_roots(&roots), vec![PathBuf::from("/srv/photos")]);
/// ```
#[must_use]
pub fn distinct_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    let resolved: Vec<Option<PathBuf>> =
        roots.iter().map(|root| root.canonicalize().ok()).collect();

    let mut kept = Vec::with_capacity(roots.len());
    for (i, candidate) in resolved.iter().enumerate() {
        let covered = candidate.as_ref().is_some_and(|candidate| {
            resolved.iter().enumerate().any(|(j, other)| match other {
                Some(other) if i != j => {
                    if candidate == other {
                        j < i
                    } else {
                        candidate.starts_with(other)
                    }
                }
                _ => false,
            })
        });

        if covered {
            log::debug!(
                "Skipping root {}: already covered by another root",
                roots[i].display()
            );
        } else {
            kept.push(roots[i].clone());
        }
    }
    kept
}

/// Counters collected during one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Files handed to the scheduler
    pub files_scheduled: usize,
    /// Files rejected by the filter
    pub files_skipped: usize,
    /// Zero-size files
    pub empty_files: usize,
    /// Directories pruned with their subtrees
    pub dirs_pruned: usize,
    /// Whether the walk stopped because shutdown was requested
    pub interrupted: bool,
}

/// Directory walker for one root.
pub struct TreeWalker<'a> {
    /// Root path to walk
    root: PathBuf,
    /// Prune/skip rules
    filter: &'a dyn PathFilter,
    /// Cancellation flag checked before each entry
    shutdown: ShutdownHandler,
}

impl<'a> TreeWalker<'a> {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `root` - Root directory to walk
    /// * `filter` - Directory pruning and file skipping rules
    /// * `shutdown` - Flag that stops the walk when set
    #[must_use]
    pub fn new(root: &Path, filter: &'a dyn PathFilter, shutdown: ShutdownHandler) -> Self {
        Self {
            root: root.to_path_buf(),
            filter,
            shutdown,
        }
    }

    /// Root path of this walker.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree, calling `schedule` for every accepted file.
    ///
    /// An accepted file is a regular, non-empty file that the filter does
    /// not skip and that does not live under a pruned directory. The root
    /// itself is never pruned.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScanError`] hit while reading a directory entry.
    /// A shutdown request is not an error: the walk stops and reports
    /// `interrupted` in its stats.
    pub fn walk<F>(&self, mut schedule: F) -> Result<WalkStats, ScanError>
    where
        F: FnMut(PathBuf),
    {
        let mut stats = WalkStats::default();
        let mut entries = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        log::debug!("Walking {}", self.root.display());

        while let Some(entry) = entries.next() {
            if self.shutdown.is_shutdown_requested() {
                log::debug!(
                    "Walker: Shutdown requested, stopping walk of {}",
                    self.root.display()
                );
                stats.interrupted = true;
                break;
            }

            let entry = entry.map_err(|e| {
                let err = ScanError::from_walkdir(&self.root, e);
                log::warn!("Walker error: {}", err);
                err
            })?;

            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if entry.depth() > 0 && self.filter.should_prune_dir(path) {
                    log::trace!("Pruning directory: {}", path.display());
                    stats.dirs_pruned += 1;
                    entries.skip_current_dir();
                }
                continue;
            }

            if !file_type.is_file() {
                log::trace!("Skipping non-regular entry: {}", path.display());
                continue;
            }

            if self.filter.should_skip_file(path) {
                log::trace!("Skipping filtered file: {}", path.display());
                stats.files_skipped += 1;
                continue;
            }

            // Files whose metadata vanished between listing and stat are
            // treated like empty files
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size == 0 {
                log::trace!("Skipping empty file: {}", path.display());
                stats.empty_files += 1;
                continue;
            }

            stats.files_scheduled += 1;
            schedule(entry.into_path());
        }

        log::debug!(
            "Walked {}: {} scheduled, {} skipped, {} empty, {} dirs pruned",
            self.root.display(),
            stats.files_scheduled,
            stats.files_skipped,
            stats.empty_files,
            stats.dirs_pruned
        );

        Ok(stats)
    }
}
