//! Process-wide append-only file logger.
//!
//! Installed as the [`log`] facade backend, so every `log::info!` and friends
//! anywhere in the process flows through one severity-gated, mutex-protected
//! sink. Records look like:
//!
//! ```text
//! [2026-08-01 14:03:27] WARN: task monitor_positions exceeded deadline by 12ms
//! ```
//!
//! [`init`] may be called repeatedly; each call swaps the sink file, closing
//! the previous one. The facade's max-level gate drops records below the
//! configured severity before any formatting happens.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

use crate::error::Error;

static SINK: OnceLock<FileLogger> = OnceLock::new();

struct FileLogger {
    file: Mutex<Option<File>>,
}

impl FileLogger {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut guard = self.lock();
        let Some(file) = guard.as_mut() else {
            // Sink closed by shutdown(); drop the record.
            return;
        };
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        // Write failures here have nowhere useful to go.
        let _ = writeln!(file, "[{stamp}] {}: {}", record.level(), record.args());
        let _ = file.flush();
    }

    fn flush(&self) {
        if let Some(file) = self.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Open `path` in append mode and route the `log` facade into it at the
/// given severity.
///
/// The first call installs the backend for the process lifetime; later calls
/// replace the sink file (closing the prior one) and update the severity
/// gate.
pub fn init(path: impl AsRef<Path>, level: LevelFilter) -> Result<(), Error> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let sink = SINK.get_or_init(|| FileLogger {
        file: Mutex::new(None),
    });
    *sink.lock() = Some(file);

    // Err means another backend (or a prior init) already owns the facade;
    // when it was us the sink swap above already took effect.
    let _ = log::set_logger(sink);
    log::set_max_level(level);
    Ok(())
}

/// Close the sink file. Records emitted afterwards are silently dropped
/// until [`init`] is called again.
pub fn shutdown() {
    if let Some(sink) = SINK.get() {
        *sink.lock() = None;
    }
}

/// Serializes tests that re-point the process-global sink; shared with the
/// runtime bootstrap tests.
#[cfg(test)]
pub(crate) static TEST_SINK_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    // The sink is process-global, so these tests serialize on one mutex and
    // assert on presence of their own marker lines rather than exact file
    // contents (other modules' tests may log concurrently).

    use super::TEST_SINK_LOCK as SERIAL;

    fn read_log(path: &Path) -> String {
        std::fs::read_to_string(path).expect("read log file")
    }

    #[test]
    fn writes_formatted_records() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panloop.log");
        init(&path, LevelFilter::Debug).unwrap();

        log::info!("logger marker alpha");
        let contents = read_log(&path);
        let line = contents
            .lines()
            .find(|l| l.contains("logger marker alpha"))
            .expect("marker line present");
        assert!(line.contains("INFO: logger marker alpha"));
        // [YYYY-MM-DD HH:MM:SS] prefix: fixed width, bracketed.
        assert!(line.starts_with('['));
        assert_eq!(line.find(']'), Some(20));
    }

    #[test]
    fn severity_gate_drops_below_level() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gated.log");
        init(&path, LevelFilter::Warn).unwrap();

        log::debug!("logger marker below gate");
        log::warn!("logger marker above gate");

        let contents = read_log(&path);
        assert!(!contents.contains("logger marker below gate"));
        assert!(contents.contains("logger marker above gate"));

        // Restore a permissive gate for other tests in this process.
        log::set_max_level(LevelFilter::Debug);
    }

    #[test]
    fn reinit_switches_sink_file() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.log");
        let second = dir.path().join("second.log");

        init(&first, LevelFilter::Debug).unwrap();
        log::info!("logger marker one");
        init(&second, LevelFilter::Debug).unwrap();
        log::info!("logger marker two");

        assert!(read_log(&first).contains("logger marker one"));
        assert!(!read_log(&first).contains("logger marker two"));
        assert!(read_log(&second).contains("logger marker two"));
    }

    #[test]
    fn shutdown_drops_records() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("closed.log");
        init(&path, LevelFilter::Debug).unwrap();
        shutdown();
        log::info!("logger marker after shutdown");

        let contents = read_log(&path);
        assert!(!contents.contains("logger marker after shutdown"));

        // Leave an open sink behind for other tests.
        init(&path, LevelFilter::Debug).unwrap();
    }
}
