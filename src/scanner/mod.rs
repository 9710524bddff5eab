//! Scanner module for directory traversal and content keys.
//!
//! This module provides functionality for:
//! - Depth-first directory walking using walkdir
//! - Directory pruning and file skipping through [`PathFilter`]
//! - Content keys through pluggable [`KeyGenerator`]s (BLAKE3 built-ins)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`filter`]: Hidden, excluded-directory and extension rules
//! - [`keygen`]: Key generator trait and built-in strategies
//!
//! # Example
//!
//! ```no_run
//! use dupescout::scanner::{Filters, TreeWalker};
//! use dupescout::signal::ShutdownHandler;
//! use std::path::Path;
//!
//! let filters = Filters {
//!     exclude_dirs: vec!["node_modules".to_string()],
//!     ..Default::default()
//! };
//!
//! let walker = TreeWalker::new(Path::new("."), &filters, ShutdownHandler::new());
//! let stats = walker.walk(|path| println!("{}", path.display())).unwrap();
//! println!("{} files accepted", stats.files_scheduled);
//! ```

pub mod filter;
pub mod keygen;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use filter::{Filters, PathFilter};
pub use keygen::{FullHashKey, KeyGenerator, KeyStrategy, PartialHashKey, SizeKey, PREHASH_SIZE};
pub use walker::{distinct_roots, TreeWalker, WalkStats};

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A symlink cycle was detected.
    #[error("Filesystem loop at {0}")]
    Loop(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify a walkdir error, falling back to `root` when it has no path.
    pub(crate) fn from_walkdir(root: &std::path::Path, error: walkdir::Error) -> Self {
        use std::io::ErrorKind;

        let path = error.path().unwrap_or(root).to_path_buf();
        if error.loop_ancestor().is_some() {
            return Self::Loop(path);
        }

        match error.into_io_error() {
            Some(source) => match source.kind() {
                ErrorKind::PermissionDenied => Self::PermissionDenied(path),
                ErrorKind::NotFound => Self::NotFound(path),
                _ => Self::Io { path, source },
            },
            None => Self::Io {
                path,
                source: std::io::Error::other("directory walk failed"),
            },
        }
    }
}

/// Errors that can occur while generating a content key.
#[derive(thiserror::Error, Debug)]
pub enum KeyError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A custom key generator reported a failure.
    #[error("Key generation failed for {path}: {message}")]
    Failed {
        /// File the key was requested for
        path: PathBuf,
        /// Generator-supplied description
        message: String,
    },
}

impl KeyError {
    /// Build a [`KeyError::Failed`] for a custom generator.
    pub fn failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Failed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Map an I/O error on `path` to the matching variant.
    #[must_use]
    pub fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
