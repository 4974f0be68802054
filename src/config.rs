//! Server configuration
//!
//! Values are layered: built-in defaults, then an optional JSON file named
//! by `RING_LOG_CONFIG`, then `RING_LOG_*` environment variables. The
//! binary applies command-line flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::protocol::DEFAULT_SEEK_PREFIX;
use crate::ring_log::DEFAULT_CAPACITY;
use crate::types::{RingLogError, RingResult, DEFAULT_TERMINATOR};

/// Environment variable naming a JSON config file
pub const CONFIG_FILE_ENV: &str = "RING_LOG_CONFIG";

/// Longest accepted timestamp interval (one week)
pub const MAX_TIMESTAMP_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for the ring log server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the TCP listener binds to
    pub bind_addr: String,
    /// Number of records kept before eviction
    pub capacity: usize,
    /// Byte ending every record
    pub terminator: u8,
    /// Tag marking a seek directive
    pub seek_prefix: String,
    /// Maximum bytes taken from a session per read
    pub read_chunk_size: usize,
    /// Seconds between timestamp records; 0 disables the producer
    pub timestamp_interval_secs: u64,
    /// Optional file mirroring the live log content
    pub backing_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".to_string(),
            capacity: DEFAULT_CAPACITY,
            terminator: DEFAULT_TERMINATOR,
            seek_prefix: DEFAULT_SEEK_PREFIX.to_string(),
            read_chunk_size: 2000,
            timestamp_interval_secs: 10,
            backing_file: None,
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by the config file and the process environment.
    ///
    /// Not validated: callers layer their own overrides on top and then
    /// call [`validate`](Self::validate) once.
    pub fn load() -> RingResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with `lookup` standing in for the environment
    pub fn load_with<F>(lookup: F) -> RingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Read a JSON config file; missing fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> RingResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            RingLogError::InvalidArgument(format!("config {}: {}", path.display(), e))
        })
    }

    /// Apply `RING_LOG_*` overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> RingResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("RING_LOG_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(capacity) = lookup("RING_LOG_CAPACITY") {
            self.capacity = parse_env("RING_LOG_CAPACITY", &capacity)?;
        }
        if let Some(secs) = lookup("RING_LOG_TIMESTAMP_SECS") {
            self.timestamp_interval_secs = parse_env("RING_LOG_TIMESTAMP_SECS", &secs)?;
        }
        if let Some(file) = lookup("RING_LOG_FILE") {
            self.backing_file = if file.is_empty() {
                None
            } else {
                Some(PathBuf::from(file))
            };
        }
        Ok(())
    }

    /// Reject values the log cannot run with
    pub fn validate(&self) -> RingResult<()> {
        if self.capacity == 0 {
            return Err(RingLogError::InvalidArgument(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.read_chunk_size == 0 {
            return Err(RingLogError::InvalidArgument(
                "read_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.timestamp_interval_secs > MAX_TIMESTAMP_INTERVAL_SECS {
            return Err(RingLogError::InvalidArgument(format!(
                "timestamp_interval_secs {} exceeds {}",
                self.timestamp_interval_secs, MAX_TIMESTAMP_INTERVAL_SECS
            )));
        }
        Ok(())
    }

    /// Producer interval, `None` when disabled
    pub fn timestamp_interval(&self) -> Option<Duration> {
        match self.timestamp_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> RingResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RingLogError::InvalidArgument(format!("{}={:?}: {}", key, value, e)))
}
