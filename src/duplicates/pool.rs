//! Bounded worker pool with first-error-wins semantics.
//!
//! # Overview
//!
//! [`WorkerPool`] runs fallible tasks on a dedicated rayon thread pool of
//! `N` threads, so at most `N` tasks execute at once. Admission is bounded
//! too: once `N * QUEUE_DEPTH_PER_WORKER` tasks are queued or running,
//! [`WorkerPool::submit`] blocks until one completes. That backpressure keeps
//! a fast directory walk from queueing the whole tree in memory.
//!
//! The first error returned by any task is kept in a single-assignment slot
//! and handed back by [`WorkerPool::wait`]; later errors are discarded.
//! After a failure, new submissions are dropped without running, while
//! already admitted tasks still run to completion and are drained by `wait`.
//! A panicking task is caught by the pool's panic handler: it counts as a
//! failure for admission and is reported by [`WorkerPool::task_panicked`].
//!
//! # Example
//!
//! ```
//! use dupescout::duplicates::WorkerPool;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let pool: WorkerPool<String> = WorkerPool::new(2).unwrap();
//! let done = Arc::new(AtomicUsize::new(0));
//!
//! for _ in 0..10 {
//!     let done = Arc::clone(&done);
//!     pool.submit(move || {
//!         done.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     });
//! }
//!
//! assert!(pool.wait().is_ok());
//! assert_eq!(done.load(Ordering::SeqCst), 10);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Admitted-but-unfinished tasks allowed per worker thread.
pub const QUEUE_DEPTH_PER_WORKER: usize = 4;

/// Bookkeeping shared between the pool handle and its tasks.
struct PoolState<E> {
    /// Tasks admitted and not yet completed.
    in_flight: Mutex<usize>,
    /// Signalled whenever `in_flight` decreases.
    completed: Condvar,
    /// First error reported, if any.
    first_error: Mutex<Option<E>>,
    /// Set when a task panicked.
    panicked: AtomicBool,
}

impl<E> PoolState<E> {
    fn in_flight(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn first_error(&self) -> MutexGuard<'_, Option<E>> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `error` unless an earlier one is already held.
    fn record(&self, error: E) -> bool {
        let mut slot = self.first_error();
        if slot.is_none() {
            *slot = Some(error);
            true
        } else {
            false
        }
    }
}

/// Marks a task complete when dropped, recording a panic if the task is
/// unwinding.
struct Completion<E> {
    state: Arc<PoolState<E>>,
}

impl<E> Drop for Completion<E> {
    fn drop(&mut self) {
        // Flag before decrementing so `wait` never returns ahead of it
        if std::thread::panicking() {
            self.state.panicked.store(true, Ordering::SeqCst);
        }
        let mut in_flight = self.state.in_flight();
        *in_flight -= 1;
        self.state.completed.notify_all();
    }
}

/// Fixed-size task scheduler with a result-collection barrier.
pub struct WorkerPool<E> {
    pool: rayon::ThreadPool,
    state: Arc<PoolState<E>>,
    workers: usize,
    capacity: usize,
}

impl<E: Send + 'static> WorkerPool<E> {
    /// Create a pool running at most `workers` tasks concurrently.
    ///
    /// A count of zero means one worker per logical CPU.
    ///
    /// # Errors
    ///
    /// Returns the rayon error if the worker threads cannot be spawned.
    pub fn new(workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = if workers == 0 {
            num_cpus::get()
        } else {
            workers
        };

        let state = Arc::new(PoolState {
            in_flight: Mutex::new(0),
            completed: Condvar::new(),
            first_error: Mutex::new(None),
            panicked: AtomicBool::new(false),
        });

        // Without a handler rayon aborts the process on a task panic
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("dupescout-worker-{}", i))
            .panic_handler(|_| log::error!("Worker task panicked"))
            .build()?;

        log::debug!("Worker pool started with {} threads", workers);

        Ok(Self {
            pool,
            state,
            workers,
            capacity: workers * QUEUE_DEPTH_PER_WORKER,
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether any task (or [`record_error`](Self::record_error)) has failed
    /// or panicked.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.task_panicked() || self.state.first_error().is_some()
    }

    /// Whether any task panicked instead of returning.
    #[must_use]
    pub fn task_panicked(&self) -> bool {
        self.state.panicked.load(Ordering::SeqCst)
    }

    /// Submit a task, blocking while the pool is at capacity.
    ///
    /// Returns `false` if the task was dropped because the pool has
    /// already failed.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        if self.has_failed() {
            log::trace!("Pool has failed, dropping submitted task");
            return false;
        }

        {
            let mut in_flight = self.state.in_flight();
            while *in_flight >= self.capacity {
                in_flight = self
                    .state
                    .completed
                    .wait(in_flight)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            *in_flight += 1;
        }

        let state = Arc::clone(&self.state);
        self.pool.spawn(move || {
            let _completion = Completion {
                state: Arc::clone(&state),
            };
            if let Err(e) = task() {
                if state.record(e) {
                    log::debug!("Worker task failed; later errors will be discarded");
                }
            }
        });

        true
    }

    /// Offer an error from work running outside the pool.
    ///
    /// Follows the same first-error-wins rule as task failures.
    pub fn record_error(&self, error: E) {
        self.state.record(error);
    }

    /// Block until every admitted task has finished, then return the first
    /// error seen.
    ///
    /// Panicked tasks carry no error value; check
    /// [`task_panicked`](Self::task_panicked) after waiting.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a task or through
    /// [`record_error`](Self::record_error).
    pub fn wait(&self) -> Result<(), E> {
        let mut in_flight = self.state.in_flight();
        while *in_flight > 0 {
            in_flight = self
                .state
                .completed
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(in_flight);

        match self.state.first_error().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
