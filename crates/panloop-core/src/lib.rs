//! # panloop-core
//!
//! **A small-footprint runtime for periodic, priority-ordered control
//! tasks.**
//!
//! `panloop-core` is the substrate for soft-real-time control loops that mix
//! timer-driven computation with peripheral I/O — serial lines, UDP sockets,
//! named pipes. It bundles a deterministic task scheduler, a Pelco-D
//! pan/tilt/zoom codec with a resynchronizing stream parser, a monotonic
//! clock, a `key=value` configuration store, a file logger, and a
//! termination-signal bridge.
//!
//! ## Quick Start
//!
//! ```no_run
//! use panloop_core::pelco::{Axis, Message};
//! use panloop_core::{Scheduler, signal};
//!
//! let mut sched = Scheduler::new(16).expect("non-zero capacity");
//!
//! sched
//!     .add_task("query_pan", 500, 0, || {
//!         let frame = Message::query_position(1, Axis::Pan);
//!         println!("{frame}");
//!     })
//!     .expect("table has room");
//!
//! signal::install_handlers();
//! sched.run(); // returns after SIGINT/SIGTERM
//! ```
//!
//! ## Architecture
//!
//! Tasks → Scheduler (sort once, dispatch due, sleep to next deadline)
//!
//! The scheduler is cooperative, not preemptive: a callback in progress is
//! never interrupted, overruns are observed and counted rather than
//! enforced, and shutdown always lets the current tick finish. Threaded
//! dispatch ([`DispatchMode::Threaded`]) overlaps I/O-bound tasks within a
//! tick at the cost of strict priority order among them.
//!
//! The Pelco-D layer ([`pelco`]) implements the classic 7-byte command set:
//! builders, validation, serialization, angle decoding, and an incremental
//! parser that survives fragmentation and framing loss.

pub mod clock;
pub mod config;
pub mod error;
pub mod io;
pub mod logger;
pub mod pelco;
pub mod runtime;
pub mod sched;
pub mod signal;

pub use config::Config;
pub use error::Error;
pub use sched::{DispatchMode, Scheduler, SchedulerHandle, TaskId, TaskSnapshot};
pub use signal::{ShutdownFlag, install_handlers, request_shutdown, should_exit};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
