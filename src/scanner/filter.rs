//! Path filtering rules consulted by the tree walker.
//!
//! The walker only knows the [`PathFilter`] trait; [`Filters`] is the
//! configurable implementation used by the CLI and settings file.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Decides which directories are pruned and which files are skipped.
///
/// Implementations should be pure: the walker may call them from several
/// threads at once and in any order.
pub trait PathFilter: Send + Sync {
    /// Return `true` to skip `path` and everything beneath it.
    fn should_prune_dir(&self, path: &Path) -> bool;

    /// Return `true` to leave the file at `path` out of the search.
    fn should_skip_file(&self, path: &Path) -> bool;
}

/// Hidden-file, excluded-directory and extension rules.
///
/// # Example
///
/// ```
/// use dupescout::scanner::{Filters, PathFilter};
/// use std::path::Path;
///
/// let filters = Filters {
///     include_hidden: false,
///     exclude_dirs: vec!["target".to_string()],
///     include_exts: vec!["jpg".to_string()],
/// };
///
/// assert!(filters.should_prune_dir(Path::new("project/target")));
/// assert!(filters.should_prune_dir(Path::new("project/.git")));
/// assert!(filters.should_skip_file(Path::new("notes.txt")));
/// assert!(!filters.should_skip_file(Path::new("photo.JPG")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    /// Search inside hidden directories and include hidden files
    /// (names starting with `.`).
    pub include_hidden: bool,

    /// Directories to prune. An entry matches a directory whose trailing
    /// path components equal it, so `node_modules` or `target/debug` work.
    pub exclude_dirs: Vec<String>,

    /// Only files with one of these extensions are searched. Matching is
    /// case-insensitive and a leading dot is optional. Empty accepts all.
    pub include_exts: Vec<String>,
}

impl Filters {
    /// Create filters that accept everything except hidden entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Include hidden files and directories.
    #[must_use]
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Add a directory exclusion.
    #[must_use]
    pub fn exclude_dir(mut self, dir: impl Into<String>) -> Self {
        self.exclude_dirs.push(dir.into());
        self
    }

    /// Add an accepted extension.
    #[must_use]
    pub fn include_ext(mut self, ext: impl Into<String>) -> Self {
        self.include_exts.push(ext.into());
        self
    }

    fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.') && n != "." && n != "..")
    }

    fn is_excluded_dir(&self, path: &Path) -> bool {
        self.exclude_dirs
            .iter()
            .map(|dir| dir.trim_end_matches(['/', '\\']))
            .filter(|dir| !dir.is_empty())
            .any(|dir| path.ends_with(dir))
    }

    fn has_included_ext(&self, path: &Path) -> bool {
        if self.include_exts.is_empty() {
            return true;
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };

        self.include_exts
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

impl PathFilter for Filters {
    fn should_prune_dir(&self, path: &Path) -> bool {
        (!self.include_hidden && Self::is_hidden(path)) || self.is_excluded_dir(path)
    }

    fn should_skip_file(&self, path: &Path) -> bool {
        (!self.include_hidden && Self::is_hidden(path)) || !self.has_included_ext(path)
    }
}
