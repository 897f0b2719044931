//! Runtime configuration.
//!
//! Loaded once at startup from a two-column `key,value` CSV; values may be
//! double-quoted. Unknown keys and unparseable numbers fall back to the
//! defaults with a warning rather than failing startup.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Live-capture device name.
    pub interface: String,
    /// BPF filter applied to offline and live captures.
    pub filter: String,
    /// Streaming flush threshold in records.
    pub max_packets: usize,
    /// Streaming flush interval in milliseconds; `<= 0` disables it in
    /// favour of a 10 s fallback.
    pub interval_ms: i64,
    /// Requested ring-buffer and live-queue capacity; see
    /// [`Config::buffer_capacity`].
    pub buffer: usize,
    /// Directory holding capture files and exports.
    pub pcap_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface: "ens18".to_string(),
            filter: "tcp && port 9191".to_string(),
            max_packets: 100,
            interval_ms: 1000,
            buffer: 10000,
            pcap_dir: PathBuf::from("pcaps"),
        }
    }
}

impl Config {
    /// Effective buffer capacity; values of 1 or less coerce to 10000.
    pub fn buffer_capacity(&self) -> usize {
        if self.buffer <= 1 {
            10000
        } else {
            self.buffer
        }
    }

    /// Load configuration from a CSV file, starting from the defaults.
    pub fn from_csv_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(',') else {
                warn!(line, "skipping malformed config line");
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            config.apply(key, value);
        }
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "interface" => self.interface = value.to_string(),
            "filter" => self.filter = value.to_string(),
            "maxPackets" => match value.parse() {
                Ok(parsed) => self.max_packets = parsed,
                Err(err) => warn!(%err, value, "ignoring bad maxPackets"),
            },
            "interval" => match value.parse() {
                Ok(parsed) => self.interval_ms = parsed,
                Err(err) => warn!(%err, value, "ignoring bad interval"),
            },
            "buffer" => match value.parse() {
                Ok(parsed) => self.buffer = parsed,
                Err(err) => warn!(%err, value, "ignoring bad buffer"),
            },
            other => warn!(key = other, "ignoring unknown config key"),
        }
    }
}
