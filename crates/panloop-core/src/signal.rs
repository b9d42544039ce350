//! Termination-signal bridge.
//!
//! Converts SIGINT/SIGTERM into a process-wide atomic shutdown flag that the
//! dispatch loop polls between ticks. The handler stores one word and does
//! nothing else; everything observable happens on ordinary threads.

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static INSTALL: Once = Once::new();

/// Install handlers for the standard termination signals (SIGINT, SIGTERM).
///
/// Idempotent; repeated calls after the first are no-ops. On the rare
/// platforms where registration fails the error is logged and the process
/// falls back to uncatchable default signal behavior.
pub fn install_handlers() {
    INSTALL.call_once(|| {
        if let Err(e) = ctrlc::set_handler(|| SHUTDOWN.store(true, Ordering::SeqCst)) {
            log::error!("failed to install termination signal handlers: {e}");
        }
    });
}

/// True once a shutdown has been requested, by signal or programmatically.
pub fn should_exit() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Request a shutdown without a signal. Sets the same process-wide flag the
/// signal handler sets; the transition is one-way for the process lifetime.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// A shutdown condition a dispatch loop polls.
///
/// [`ShutdownFlag::process`] aliases the process-wide flag driven by the
/// signal bridge; [`ShutdownFlag::local`] creates a private flag, which is
/// what embedders and tests use to stop one scheduler without touching the
/// rest of the process.
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    local: Option<Arc<AtomicBool>>,
}

impl ShutdownFlag {
    /// Alias the process-wide flag set by SIGINT/SIGTERM.
    pub fn process() -> Self {
        Self { local: None }
    }

    /// Create a private flag, independent of the signal bridge.
    pub fn local() -> Self {
        Self {
            local: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Observe the flag.
    pub fn is_set(&self) -> bool {
        match &self.local {
            Some(flag) => flag.load(Ordering::SeqCst),
            None => should_exit(),
        }
    }

    /// Set the flag. Idempotent.
    pub fn set(&self) {
        match &self.local {
            Some(flag) => flag.store(true, Ordering::SeqCst),
            None => request_shutdown(),
        }
    }
}
