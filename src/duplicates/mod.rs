//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Bounded, first-error-wins task execution ([`pool`])
//! - Grouping (key, path) pairs into duplicates ([`aggregator`])
//! - Running a search in batch or streaming mode ([`finder`])

pub mod aggregator;
pub mod finder;
pub mod pool;

pub use aggregator::{Aggregator, Pair, Sink};
pub use finder::{
    get_results, spawn_stream, stream_results, ErrorKind, FinderError, SearchConfig,
    PAIR_CHANNEL_CAPACITY,
};
pub use pool::{WorkerPool, QUEUE_DEPTH_PER_WORKER};
