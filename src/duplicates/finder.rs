//! Duplicate search orchestration.
//!
//! # Overview
//!
//! One search run wires together:
//! 1. **Walkers** - up to one thread per worker, sharing the distinct roots
//!    and running a [`TreeWalker`] over each
//! 2. **Producers** - one [`WorkerPool`] task per accepted file, computing its key
//! 3. **Aggregator** - one thread grouping [`Pair`]s by key
//! 4. **Shutdown** - a [`ShutdownHandler`] subscribed to interrupt signals
//!
//! The coordinating thread waits for the walkers, then for the pool, and
//! only then drops the last pair sender. Closing the pair channel any
//! earlier would lose in-flight pairs; the aggregator ends its loop only
//! when the channel closes.
//!
//! # Example
//!
//! ```no_run
//! use dupescout::duplicates::{get_results, SearchConfig};
//! use dupescout::scanner::KeyStrategy;
//!
//! let config = SearchConfig::new(["/home/user/Pictures"])
//!     .with_key_strategy(KeyStrategy::Full)
//!     .with_workers(8);
//!
//! for path in get_results(config).unwrap() {
//!     println!("{}", path.display());
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::aggregator::{Aggregator, Pair, Sink};
use super::pool::WorkerPool;
use crate::scanner::{
    distinct_roots, Filters, KeyError, KeyGenerator, KeyStrategy, PathFilter, ScanError,
    TreeWalker,
};
use crate::signal::{self, ShutdownHandler};

/// Capacity of the producer-to-aggregator channel.
pub const PAIR_CHANNEL_CAPACITY: usize = 500;

/// Broad class of a [`FinderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The search was set up wrongly or a collaborator broke its contract.
    Configuration,
    /// The directory walk failed.
    Traversal,
    /// A key generator failed for a file.
    KeyGeneration,
    /// Threads could not be started or the pipeline broke down.
    Runtime,
}

/// Errors that abort a duplicate search.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// No root directories were configured.
    #[error("No search roots configured")]
    NoRoots,

    /// The key generator returned an empty or blank key.
    #[error("Key generator returned an empty key for path: {0}")]
    EmptyKey(PathBuf),

    /// A directory walk failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The key generator failed.
    #[error(transparent)]
    KeyGeneration(#[from] KeyError),

    /// The worker pool could not be created.
    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// A pipeline thread could not be spawned.
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread name
        name: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A walker thread panicked, leaving its roots partly walked.
    #[error("Directory walker panicked")]
    WalkerPanicked,

    /// A key generation task panicked.
    #[error("Key generation task panicked")]
    TaskPanicked,

    /// The aggregator stopped before the producers finished.
    #[error("Pair aggregator stopped unexpectedly")]
    AggregatorStopped,
}

impl FinderError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoRoots | Self::EmptyKey(_) => ErrorKind::Configuration,
            Self::Scan(_) => ErrorKind::Traversal,
            Self::KeyGeneration(_) => ErrorKind::KeyGeneration,
            Self::Pool(_)
            | Self::Spawn { .. }
            | Self::WalkerPanicked
            | Self::TaskPanicked
            | Self::AggregatorStopped => ErrorKind::Runtime,
        }
    }

    /// Whether this is a configuration-class error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

/// Configuration for one search run.
#[derive(Clone)]
pub struct SearchConfig {
    /// Root directories to search.
    pub roots: Vec<PathBuf>,
    /// Directory pruning and file skipping rules.
    pub filter: Arc<dyn PathFilter>,
    /// Content key generator.
    pub key_generator: Arc<dyn KeyGenerator>,
    /// Maximum concurrent key generations (0 = one per logical CPU).
    pub workers: usize,
    /// Caller-owned cancellation flag; a fresh one is used when unset.
    pub shutdown: Option<ShutdownHandler>,
    /// Subscribe to SIGINT/SIGTERM for the duration of the run.
    pub handle_signals: bool,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("roots", &self.roots)
            .field("filter", &"<filter>")
            .field("key_generator", &"<key generator>")
            .field("workers", &self.workers)
            .field("shutdown", &self.shutdown)
            .field("handle_signals", &self.handle_signals)
            .finish()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            filter: Arc::new(Filters::default()),
            key_generator: KeyStrategy::default().generator(),
            workers: 0,
            shutdown: None,
            handle_signals: true,
        }
    }
}

impl SearchConfig {
    /// Create a configuration searching `roots` with default filters and keys.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the filter rules.
    #[must_use]
    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filter = Arc::new(filters);
        self
    }

    /// Use a custom [`PathFilter`].
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn PathFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Use a custom [`KeyGenerator`].
    #[must_use]
    pub fn with_key_generator<K>(mut self, key_generator: K) -> Self
    where
        K: KeyGenerator + 'static,
    {
        self.key_generator = Arc::new(key_generator);
        self
    }

    /// Use one of the built-in key strategies.
    #[must_use]
    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_generator = strategy.generator();
        self
    }

    /// Set the worker count (0 = one per logical CPU).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Share a cancellation flag with the caller.
    #[must_use]
    pub fn with_shutdown_handler(mut self, handler: ShutdownHandler) -> Self {
        self.shutdown = Some(handler);
        self
    }

    /// Enable or disable interrupt signal subscription.
    #[must_use]
    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Worker count after applying the host-parallelism default.
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// Computes a key for one file and sends the pair to the aggregator.
#[derive(Clone)]
pub(crate) struct PairProducer {
    key_generator: Arc<dyn KeyGenerator>,
    pairs: Sender<Pair>,
    shutdown: ShutdownHandler,
}

impl PairProducer {
    pub(crate) fn new(
        key_generator: Arc<dyn KeyGenerator>,
        pairs: Sender<Pair>,
        shutdown: ShutdownHandler,
    ) -> Self {
        Self {
            key_generator,
            pairs,
            shutdown,
        }
    }

    /// Produce the pair for `path`.
    ///
    /// Does nothing once shutdown has been requested.
    pub(crate) fn produce(&self, path: PathBuf) -> Result<(), FinderError> {
        if self.shutdown.is_shutdown_requested() {
            log::trace!("Producer: Shutdown requested, skipping {}", path.display());
            return Ok(());
        }

        let key = self.key_generator.generate(&path)?;
        if key.trim().is_empty() {
            return Err(FinderError::EmptyKey(path));
        }

        self.pairs
            .send(Pair { key, path })
            .map_err(|_| FinderError::AggregatorStopped)
    }
}

/// Running search whose pool has drained.
struct Completed {
    result: Result<(), FinderError>,
    aggregator: JoinHandle<Option<Vec<PathBuf>>>,
}

/// Launch the pipeline and block until all producers have finished.
fn run(config: SearchConfig, sink: Sink) -> Result<Completed, FinderError> {
    if config.roots.is_empty() {
        return Err(FinderError::NoRoots);
    }

    let start_time = Instant::now();
    let workers = config.resolved_workers();
    let shutdown = config.shutdown.clone().unwrap_or_default();
    let roots = distinct_roots(&config.roots);

    // Held for the whole run; dropping it unsubscribes
    let _subscription = if config.handle_signals {
        match signal::subscribe(&shutdown) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                log::warn!("{}; continuing without interrupt handling", e);
                None
            }
        }
    } else {
        None
    };

    let pool: WorkerPool<FinderError> = WorkerPool::new(workers)?;
    let (pair_tx, pair_rx) = bounded::<Pair>(PAIR_CHANNEL_CAPACITY);

    let streaming = sink.is_streaming();
    let aggregator = thread::Builder::new()
        .name("dupescout-aggregator".to_string())
        .spawn(move || Aggregator::new(sink).run(pair_rx))
        .map_err(|source| FinderError::Spawn {
            name: "aggregator".to_string(),
            source,
        })?;

    let walker_threads = roots.len().min(workers);
    log::info!(
        "Searching {} root(s) with {} workers and {} walker(s) ({} mode)",
        roots.len(),
        workers,
        walker_threads,
        if streaming { "streaming" } else { "batch" }
    );

    let producer = PairProducer::new(config.key_generator.clone(), pair_tx, shutdown.clone());
    let filter: &dyn PathFilter = config.filter.as_ref();
    let next_root = AtomicUsize::new(0);

    let files_scheduled: usize = thread::scope(|scope| {
        let mut walkers = Vec::with_capacity(walker_threads);

        for i in 0..walker_threads {
            let pool = &pool;
            let producer = &producer;
            let roots = &roots;
            let next_root = &next_root;
            let shutdown = shutdown.clone();

            let spawned = thread::Builder::new()
                .name(format!("dupescout-walker-{}", i))
                .spawn_scoped(scope, move || {
                    let mut scheduled = 0;
                    while let Some(root) = roots.get(next_root.fetch_add(1, Ordering::Relaxed)) {
                        if pool.has_failed() || shutdown.is_shutdown_requested() {
                            break;
                        }

                        let walker = TreeWalker::new(root, filter, shutdown.clone());
                        let walked = walker.walk(|path| {
                            let producer = producer.clone();
                            pool.submit(move || producer.produce(path));
                        });

                        match walked {
                            Ok(stats) => scheduled += stats.files_scheduled,
                            Err(e) => {
                                pool.record_error(e.into());
                                break;
                            }
                        }
                    }
                    scheduled
                });

            match spawned {
                Ok(handle) => walkers.push(handle),
                Err(source) => pool.record_error(FinderError::Spawn {
                    name: format!("walker-{}", i),
                    source,
                }),
            }
        }

        walkers
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(scheduled) => scheduled,
                Err(_) => {
                    log::error!("Walker thread panicked; search results are incomplete");
                    pool.record_error(FinderError::WalkerPanicked);
                    0
                }
            })
            .sum()
    });

    let result = pool.wait().and_then(|()| {
        if pool.task_panicked() {
            Err(FinderError::TaskPanicked)
        } else {
            Ok(())
        }
    });

    // Every producer task has finished, so this drops the last sender
    drop(producer);

    if shutdown.is_shutdown_requested() {
        log::info!("Search interrupted; results cover work finished before shutdown");
    }

    log::info!(
        "Search finished in {:.2?}: {} files keyed{}",
        start_time.elapsed(),
        files_scheduled,
        if result.is_err() { " (failed)" } else { "" }
    );

    Ok(Completed { result, aggregator })
}

/// Run a search and return every duplicate path once it completes (blocking).
///
/// Paths sharing a key are adjacent; groups appear in the order their key
/// was first seen.
///
/// # Errors
///
/// Returns the first [`FinderError`] raised by any walker or producer.
/// Partial results are discarded in that case.
pub fn get_results(config: SearchConfig) -> Result<Vec<PathBuf>, FinderError> {
    let Completed { result, aggregator } = run(config, Sink::Batch)?;

    let joined = aggregator.join();

    result?;
    joined
        .ok()
        .flatten()
        .ok_or(FinderError::AggregatorStopped)
}

/// Run a search, sending duplicate paths to `dupes` as they are found.
///
/// Returns once every producer has finished. The channel is closed when
/// the aggregator has drained the remaining pairs, which may be slightly
/// after this function returns. Consume `dupes` on another thread: if it is
/// bounded and nobody reads it, the search stalls.
///
/// # Errors
///
/// Returns the first [`FinderError`] raised by any walker or producer.
/// Paths already sent remain valid and the channel is still closed.
pub fn stream_results(config: SearchConfig, dupes: Sender<PathBuf>) -> Result<(), FinderError> {
    let Completed { result, .. } = run(config, Sink::Stream(dupes))?;
    result
}

/// Run a streaming search on its own thread.
///
/// Returns the receiving end of the duplicate stream and a handle yielding
/// the search result.
///
/// # Example
///
/// ```no_run
/// use dupescout::duplicates::{spawn_stream, SearchConfig};
///
/// let (dupes, search) = spawn_stream(SearchConfig::new(["."]));
/// for path in dupes {
///     println!("{}", path.display());
/// }
/// search.join().unwrap().unwrap();
/// ```
#[must_use]
pub fn spawn_stream(
    config: SearchConfig,
) -> (Receiver<PathBuf>, JoinHandle<Result<(), FinderError>>) {
    let (tx, rx) = unbounded();
    let handle = thread::spawn(move || stream_results(config, tx));
    (rx, handle)
}
