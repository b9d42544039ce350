//! Line-oriented `key=value` configuration store.
//!
//! One entry per line; `#` in column 1 or an empty line is skipped. The line
//! splits on the first `=`, and both sides keep their whitespace — values are
//! handed to consumers exactly as written. The table is immutable after
//! loading, so any number of threads may read it concurrently.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Error;

/// Maximum stored key length in bytes; longer keys are truncated.
pub const MAX_KEY_LEN: usize = 127;
/// Maximum stored value length in bytes; longer values are truncated.
pub const MAX_VALUE_LEN: usize = 255;

/// In-memory configuration table.
#[derive(Debug, Default)]
pub struct Config {
    entries: Vec<(String, String)>,
}

impl Config {
    /// Load a configuration file.
    ///
    /// Malformed lines (no `=`) are skipped with a warning rather than
    /// aborting the load; over-long keys and values are truncated at
    /// [`MAX_KEY_LEN`]/[`MAX_VALUE_LEN`] with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("config {}: skipping malformed line {line:?}", path.display());
                continue;
            };
            entries.push((
                clamp_field(key, MAX_KEY_LEN, "key"),
                clamp_field(value, MAX_VALUE_LEN, "value"),
            ));
        }
        Ok(Self { entries })
    }

    /// Look up a key (case-sensitive). Later duplicate entries win.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a key and parse the value as `u32`.
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key)?.trim().parse().ok()
    }

    /// Look up a key and parse the value as `u16`.
    pub fn get_u16(&self, key: &str) -> Option<u16> {
        self.get(key)?.trim().parse().ok()
    }

    /// Number of stored entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries were loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Truncate a field at `max` bytes, backing up to a UTF-8 boundary.
fn clamp_field(field: &str, max: usize, what: &str) -> String {
    if field.len() <= max {
        return field.to_string();
    }
    log::warn!("config: {what} exceeds {max} bytes, truncating");
    let mut end = max;
    while !field.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn loads_simple_entries() {
        let file = write_config("host=127.0.0.1\nport=9000\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("host"), Some("127.0.0.1"));
        assert_eq!(config.get("port"), Some("9000"));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let file = write_config("# a comment\n\nmode=serial\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("mode"), Some("serial"));
    }

    #[test]
    fn skips_lines_without_equals() {
        let file = write_config("not a pair\nkey=value\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("key"), Some("value"));
    }

    #[test]
    fn later_duplicates_win() {
        let file = write_config("addr=1\naddr=2\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.get("addr"), Some("2"));
    }

    #[test]
    fn preserves_whitespace_in_values() {
        let file = write_config("greeting= hello world \n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.get("greeting"), Some(" hello world "));
    }

    #[test]
    fn splits_on_first_equals_only() {
        let file = write_config("expr=a=b=c\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.get("expr"), Some("a=b=c"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let file = write_config("Key=upper\nkey=lower\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.get("Key"), Some("upper"));
        assert_eq!(config.get("key"), Some("lower"));
        assert_eq!(config.get("KEY"), None);
    }

    #[test]
    fn truncates_long_fields() {
        let long_key = "k".repeat(MAX_KEY_LEN + 10);
        let long_value = "v".repeat(MAX_VALUE_LEN + 10);
        let file = write_config(&format!("{long_key}={long_value}\n"));
        let config = Config::load(file.path()).unwrap();
        let stored_key = "k".repeat(MAX_KEY_LEN);
        assert_eq!(
            config.get(&stored_key),
            Some("v".repeat(MAX_VALUE_LEN).as_str())
        );
    }

    #[test]
    fn typed_lookups_parse() {
        let file = write_config("port=9600\nbad=oops\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.get_u32("port"), Some(9600));
        assert_eq!(config.get_u16("port"), Some(9600));
        assert_eq!(config.get_u32("bad"), None);
        assert_eq!(config.get_u32("missing"), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = Config::load("/nonexistent/panloop.conf");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
