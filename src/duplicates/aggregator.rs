//! Pair aggregation into duplicate groups.
//!
//! # Overview
//!
//! Producers send one [`Pair`] per accepted file. A single [`Aggregator`]
//! consumes them and groups paths by key. Because only the aggregator
//! touches its map, no locking is needed beyond the channel itself.
//!
//! The aggregator delivers results through a [`Sink`]:
//!
//! - [`Sink::Batch`]: nothing is emitted until the pair channel closes;
//!   then every group with two or more members is flattened into one
//!   result, ordered by when each key was first seen.
//! - [`Sink::Stream`]: paths are emitted as soon as they become duplicates.
//!   On a key's second occurrence both the first and the new path are sent;
//!   on every later occurrence only the new path is sent. The stream closes
//!   when the aggregator finishes.
//!
//! # Example
//!
//! ```
//! use dupescout::duplicates::{Aggregator, Pair, Sink};
//! use std::path::PathBuf;
//!
//! let mut aggregator = Aggregator::new(Sink::Batch);
//! aggregator.consume(Pair::new("1", "/a"));
//! aggregator.consume(Pair::new("1", "/b"));
//! aggregator.consume(Pair::new("2", "/c"));
//!
//! let paths = aggregator.finish().unwrap();
//! assert_eq!(paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
//! ```

use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;

/// A content key together with the file it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// Key returned by the key generator
    pub key: String,
    /// File the key belongs to
    pub path: PathBuf,
}

impl Pair {
    /// Create a new pair.
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }
}

/// Where the aggregator delivers duplicate paths.
#[derive(Debug, Clone)]
pub enum Sink {
    /// Collect everything and return it once from [`Aggregator::finish`].
    Batch,
    /// Send duplicate paths as they are found; the channel closes on finish.
    Stream(Sender<PathBuf>),
}

impl Sink {
    /// Whether this sink streams results.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

/// Groups pairs by key and delivers duplicate paths to its sink.
#[derive(Debug)]
pub struct Aggregator {
    /// Key to paths, in order of first discovery
    groups: IndexMap<String, Vec<PathBuf>>,
    /// Output mode
    sink: Sink,
    /// Paths sent on the stream so far
    emitted: usize,
    /// Set once the stream receiver has gone away
    receiver_gone: bool,
}

impl Aggregator {
    /// Create an aggregator delivering to `sink`.
    #[must_use]
    pub fn new(sink: Sink) -> Self {
        Self {
            groups: IndexMap::new(),
            sink,
            emitted: 0,
            receiver_gone: false,
        }
    }

    /// Number of distinct keys seen so far.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of paths sent on the stream so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Add one pair, emitting to the stream when it completes a duplicate.
    pub fn consume(&mut self, pair: Pair) {
        let Pair { key, path } = pair;

        let Some(paths) = self.groups.get_mut(&key) else {
            self.groups.insert(key, vec![path]);
            return;
        };

        if let Sink::Stream(ref tx) = self.sink {
            if !self.receiver_gone {
                let mut outgoing = Vec::with_capacity(2);
                if paths.len() == 1 {
                    outgoing.push(paths[0].clone());
                }
                outgoing.push(path.clone());

                for dupe in outgoing {
                    if tx.send(dupe).is_err() {
                        log::debug!("Result receiver dropped, no longer streaming duplicates");
                        self.receiver_gone = true;
                        break;
                    }
                    self.emitted += 1;
                }
            }
        }

        paths.push(path);
    }

    /// Finish aggregation.
    ///
    /// In batch mode returns every group with two or more members,
    /// flattened in discovery order. In streaming mode closes the stream
    /// and returns `None`.
    #[must_use]
    pub fn finish(self) -> Option<Vec<PathBuf>> {
        match self.sink {
            Sink::Batch => {
                let duplicates: Vec<PathBuf> = self
                    .groups
                    .into_values()
                    .filter(|paths| paths.len() > 1)
                    .flatten()
                    .collect();
                log::debug!("Aggregated {} duplicate paths", duplicates.len());
                Some(duplicates)
            }
            Sink::Stream(tx) => {
                log::debug!("Streamed {} duplicate paths", self.emitted);
                drop(tx);
                None
            }
        }
    }

    /// Consume pairs until every sender is dropped, then [`finish`](Self::finish).
    #[must_use]
    pub fn run(mut self, pairs: Receiver<Pair>) -> Option<Vec<PathBuf>> {
        for pair in pairs {
            self.consume(pair);
        }
        self.finish()
    }
}
