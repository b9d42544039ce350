//! Startup and teardown wrapper.
//!
//! Bundles the boot sequence every panloop process shares: load the
//! configuration file, then point the file logger at the configured sink.
//! Signal handlers are installed separately (see [`crate::signal`]) so that
//! short-lived tools can bootstrap without touching process signal state.

use std::path::Path;

use log::LevelFilter;

use crate::config::Config;
use crate::error::Error;
use crate::logger;

/// Load configuration and initialize the file logger.
///
/// Returns the loaded [`Config`]; either failure aborts startup.
pub fn init(
    config_path: impl AsRef<Path>,
    log_path: impl AsRef<Path>,
    level: LevelFilter,
) -> Result<Config, Error> {
    let config = Config::load(config_path)?;
    logger::init(log_path, level)?;
    log::info!("runtime up ({} config entries)", config.len());
    Ok(config)
}

/// Flush and close the log sink.
pub fn shutdown() {
    log::info!("runtime down");
    logger::shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn init_loads_config_and_logger() {
        let _serial = crate::logger::TEST_SINK_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("panloop.conf");
        let log_path = dir.path().join("panloop.log");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "camera_address=1").unwrap();

        let config = init(&config_path, &log_path, LevelFilter::Debug).unwrap();
        assert_eq!(config.get("camera_address"), Some("1"));
        assert!(log_path.exists());
    }

    #[test]
    fn init_fails_on_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("panloop.log");
        let result = init(dir.path().join("absent.conf"), &log_path, LevelFilter::Info);
        assert!(result.is_err());
    }
}
