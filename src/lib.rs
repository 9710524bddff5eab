//! dupescout - Concurrent duplicate file discovery
//!
//! Walks one or more directory trees in parallel, computes a content key for
//! every non-empty file and reports the files whose keys collide, either as a
//! complete list or as a stream while the search runs.
//!
//! # Library use
//!
//! ```no_run
//! use dupescout::duplicates::{get_results, SearchConfig};
//! use dupescout::scanner::Filters;
//!
//! let config = SearchConfig::new(["/home/user/Music"])
//!     .with_filters(Filters::new().include_ext("mp3").exclude_dir(".cache"));
//!
//! let dupes = get_results(config)?;
//! println!("{} duplicate files", dupes.len());
//! # Ok::<(), dupescout::duplicates::FinderError>(())
//! ```

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};

use anyhow::Context;

use crate::cli::Cli;
use crate::config::Settings;
use crate::duplicates::{get_results, spawn_stream};
use crate::error::ExitCode;
use crate::signal::ShutdownHandler;

/// Run the dupescout command line application.
///
/// Results go to stdout; logs go to stderr.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded, the search fails or
/// results cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    cli.apply_to(&mut settings);
    log::debug!("Effective settings: {:?}", settings);

    let shutdown = ShutdownHandler::new();
    let config = settings
        .into_search_config()
        .with_shutdown_handler(shutdown.clone());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let found = if cli.stream {
        stream_to(&mut out, config, cli.output)?
    } else {
        let paths = get_results(config)?;
        output::write_batch(
            &mut out,
            &paths,
            cli.output,
            shutdown.is_shutdown_requested(),
        )?;
        paths.len()
    };

    if shutdown.is_shutdown_requested() {
        Ok(ExitCode::Interrupted)
    } else if found == 0 {
        Ok(ExitCode::NoDuplicates)
    } else {
        Ok(ExitCode::Success)
    }
}

/// Print duplicates as the search reports them; returns how many were printed.
fn stream_to<W: Write>(
    out: &mut W,
    config: duplicates::SearchConfig,
    format: cli::OutputFormat,
) -> anyhow::Result<usize> {
    let (dupes, search) = spawn_stream(config);

    let mut written = 0;
    let mut write_error = None;
    for path in dupes.iter() {
        if let Err(e) = output::write_streamed(out, &path, format) {
            write_error = Some(e);
            break;
        }
        written += 1;
    }
    // Remaining paths are discarded by the aggregator once this end is gone
    drop(dupes);

    search
        .join()
        .map_err(|_| anyhow::anyhow!("Search thread panicked"))??;

    if let Some(e) = write_error {
        return Err(e.into());
    }
    Ok(written)
}
