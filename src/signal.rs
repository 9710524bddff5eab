//! Signal handling for cooperative shutdown.
//!
//! A search never kills in-flight work. Instead, an interrupt (Ctrl+C,
//! SIGTERM) flips a shared [`ShutdownHandler`] flag that the tree walker and
//! the pair producers consult before starting each new unit of work.
//!
//! The OS-level hook is installed once per process with `ctrlc`. Each search
//! run then [`subscribe`]s its own handler for as long as the returned
//! [`Subscription`] guard lives, so concurrent runs (as in the test suite)
//! never observe each other's flags.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupescout::signal::{subscribe, ShutdownHandler};
//!
//! let handler = ShutdownHandler::new();
//! let _subscription = subscribe(&handler).expect("Failed to install signal handler");
//!
//! // Walker and producers check this before each unit of work
//! if handler.is_shutdown_requested() {
//!     println!("Shutdown requested, draining in-flight work...");
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Cancellation flag for one search run.
///
/// Wraps an `AtomicBool` that moves from "running" to "shutting down" at
/// most once. Clones share the same flag.
///
/// # Thread Safety
///
/// `ShutdownHandler` is `Send` and `Sync`, and the underlying flag uses
/// atomic operations for thread-safe access.
#[derive(Debug, Clone)]
pub struct ShutdownHandler {
    /// The shared atomic flag indicating shutdown was requested.
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a new shutdown handler with the flag initially set to `false`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a cooperative shutdown.
    ///
    /// Only the first call changes state and logs; later calls are no-ops.
    /// Returns `true` if this call performed the transition.
    pub fn request_shutdown(&self) -> bool {
        let first = !self.flag.swap(true, Ordering::SeqCst);
        if first {
            log::info!("Shutdown requested, finishing in-flight work before stopping");
        }
        first
    }

    /// Get a clone of the shutdown flag for code that only needs the atomic.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),

    /// A previous installation attempt in this process failed.
    #[error("Signal handling is unavailable in this process")]
    Unavailable,
}

/// Handlers currently subscribed to interrupt notifications.
static SUBSCRIBERS: Mutex<Vec<(u64, ShutdownHandler)>> = Mutex::new(Vec::new());

/// Subscription id source.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Whether the process-wide `ctrlc` hook is in place.
static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Guard keeping a handler subscribed to interrupt notifications.
///
/// Dropping it unsubscribes the handler; the handler's flag keeps whatever
/// value it had.
#[derive(Debug)]
#[must_use = "the handler is unsubscribed as soon as the subscription is dropped"]
pub struct Subscription {
    id: u64,
    handler: ShutdownHandler,
}

impl Subscription {
    /// The handler this subscription feeds.
    #[must_use]
    pub fn handler(&self) -> &ShutdownHandler {
        &self.handler
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subscribers = SUBSCRIBERS.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|(id, _)| *id != self.id);
    }
}

/// Subscribe `handler` to SIGINT/SIGTERM for the lifetime of the returned guard.
///
/// The first call installs the process-wide hook. When a signal arrives,
/// every live subscriber has its shutdown requested and a short notice is
/// printed to stderr.
///
/// # Errors
///
/// Returns [`SignalError`] if the hook could not be installed, for example
/// because another Ctrl+C handler already owns the process. Callers can
/// still trigger shutdown manually through the handler.
pub fn subscribe(handler: &ShutdownHandler) -> Result<Subscription, SignalError> {
    install_hook()?;

    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    SUBSCRIBERS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((id, handler.clone()));

    log::trace!("Shutdown handler subscribed (id {})", id);
    Ok(Subscription {
        id,
        handler: handler.clone(),
    })
}

fn install_hook() -> Result<(), SignalError> {
    let mut failure = None;
    let installed = *INSTALLED.get_or_init(|| match ctrlc::set_handler(notify_subscribers) {
        Ok(()) => {
            log::debug!("Interrupt handler installed");
            true
        }
        Err(e) => {
            failure = Some(e);
            false
        }
    });

    match (installed, failure) {
        (true, _) => Ok(()),
        (false, Some(e)) => Err(SignalError::InstallFailed(e)),
        (false, None) => Err(SignalError::Unavailable),
    }
}

fn notify_subscribers() {
    let subscribers = SUBSCRIBERS.lock().unwrap_or_else(PoisonError::into_inner);

    let _ = writeln!(
        std::io::stderr(),
        "\nReceived signal, shutting down after current workers are done..."
    );
    let _ = std::io::stderr().flush();

    for (_, handler) in subscribers.iter() {
        handler.request_shutdown();
    }
}

#[cfg(test)]
fn is_subscribed(id: u64) -> bool {
    SUBSCRIBERS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .any(|(sub, _)| *sub == id)
}
