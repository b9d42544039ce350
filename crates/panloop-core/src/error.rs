//! Error type shared by the runtime modules.
//!
//! Protocol-layer failures have their own enum, [`crate::pelco::PelcoError`],
//! so transport and scheduling code never has to pattern-match on wire-format
//! details.

use thiserror::Error;

/// Errors surfaced by the scheduler, configuration store, logger, and
/// runtime bootstrap.
///
/// Setup-phase errors abort startup and are returned to the caller; once the
/// dispatch loop is running, problems are logged and counted instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The task table capacity passed to the scheduler was zero.
    #[error("task table capacity must be non-zero")]
    InvalidCapacity,

    /// The task table is full; no further tasks can be registered.
    #[error("task table is full ({capacity} tasks)")]
    TableFull {
        /// Configured capacity of the table.
        capacity: usize,
    },

    /// A task was registered with a zero interval.
    #[error("task interval must be non-zero")]
    InvalidInterval,

    /// A task was registered with an empty name.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// Underlying file or transport I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
