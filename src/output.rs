//! Result formatting for the dupescout binary.
//!
//! # Batch JSON schema
//!
//! ```json
//! {
//!   "count": 2,
//!   "duplicates": ["/photos/a.jpg", "/backup/a.jpg"],
//!   "interrupted": false
//! }
//! ```
//!
//! In streaming mode each path is written as soon as it arrives, either as a
//! plain line or as one `{"path": "..."}` object per line.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::OutputFormat;

/// Errors that can occur while writing results.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error while writing results: {0}")]
    Io(#[from] std::io::Error),
}

/// Batch output document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Number of duplicate paths
    pub count: usize,
    /// Every duplicate path, grouped by key
    pub duplicates: Vec<String>,
    /// Whether the search was interrupted
    pub interrupted: bool,
}

impl JsonOutput {
    /// Build the document for a finished search.
    #[must_use]
    pub fn new(paths: &[PathBuf], interrupted: bool) -> Self {
        Self {
            count: paths.len(),
            duplicates: paths.iter().map(|p| path_string(p)).collect(),
            interrupted,
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    path: &'a str,
}

/// Write the full result list of a batch search.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_batch<W: Write>(
    writer: &mut W,
    paths: &[PathBuf],
    format: OutputFormat,
    interrupted: bool,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => {
            for path in paths {
                writeln!(writer, "{}", path.display())?;
            }
        }
        OutputFormat::Json => {
            let output = JsonOutput::new(paths, interrupted);
            serde_json::to_writer_pretty(&mut *writer, &output)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write one streamed duplicate path and flush it.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_streamed<W: Write>(
    writer: &mut W,
    path: &Path,
    format: OutputFormat,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => writeln!(writer, "{}", path.display())?,
        OutputFormat::Json => {
            let path = path_string(path);
            serde_json::to_writer(&mut *writer, &JsonLine { path: &path })?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
