//! Configuration for the store and its evaluators
//!
//! Provides:
//! - TOML configuration files
//! - Environment variable overrides
//! - Multiple config file locations
//!
//! # Configuration File Locations
//!
//! Configuration files are searched in order (first found wins):
//! 1. `./quadstore.toml` - Project-local configuration
//! 2. `~/.config/quadstore/config.toml` - User configuration (XDG)
//! 3. `/etc/quadstore/config.toml` - System-wide configuration
//!
//! # Environment Variables
//!
//! - `QUADSTORE_LOG_LEVEL` - Logging verbosity (quiet, normal, verbose, debug)
//! - `QUADSTORE_QUERY_TIMEOUT_MS` - Query timeout in milliseconds, 0 for none
//! - `QUADSTORE_PARTIAL_RESULTS` - Return partial results on timeout (true/false)
//! - `QUADSTORE_OPTIMIZE_BGP` - Reorder BGP patterns by selectivity (true/false)
//! - `QUADSTORE_UPDATE_TIMEOUT_MS` - Timeout for update WHERE clauses
//!
//! # Example Configuration
//!
//! ```toml
//! [general]
//! log_level = "verbose"
//!
//! [query]
//! timeout_ms = 30000
//! partial_results = false
//! optimize_bgp = true
//! max_path_depth = 1000
//! describe_objects = true
//!
//! [update]
//! timeout_ms = 0
//! allow_load = true
//!
//! [prefixes]
//! ex = "http://example.org/"
//! foaf = "http://xmlns.com/foaf/0.1/"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

// ============================================================================
// Configuration Schema
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Query evaluation settings
    pub query: QueryConfig,
    /// Update processing settings
    pub update: UpdateConfig,
    /// Prefixes added to every graph created with `Graph::with_config`
    pub prefixes: BTreeMap<String, String>,
}

/// General configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Logging level
    pub log_level: LogLevel,
}

/// Query evaluation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Wall-clock limit per query in milliseconds; 0 disables it
    pub timeout_ms: u64,
    /// Return the rows produced so far when the limit is hit
    pub partial_results: bool,
    /// Reorder BGP patterns by estimated selectivity
    pub optimize_bgp: bool,
    /// Depth limit of `*` and `+` property paths
    pub max_path_depth: usize,
    /// DESCRIBE includes triples with the resource as object
    pub describe_objects: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            partial_results: false,
            optimize_bgp: true,
            max_path_depth: 1_000,
            describe_objects: true,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Update processing options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Wall-clock limit for each WHERE clause in milliseconds; 0 disables it
    pub timeout_ms: u64,
    /// Whether LOAD commands may run
    pub allow_load: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self { timeout_ms: 0, allow_load: true }
    }
}

impl UpdateConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Log level options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" | "q" | "0" => Some(LogLevel::Quiet),
            "normal" | "n" | "1" => Some(LogLevel::Normal),
            "verbose" | "v" | "2" => Some(LogLevel::Verbose),
            "debug" | "d" | "3" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// Filter for a `tracing` subscriber installed by the host
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Quiet => LevelFilter::ERROR,
            LogLevel::Normal => LevelFilter::WARN,
            LogLevel::Verbose => LevelFilter::DEBUG,
            LogLevel::Debug => LevelFilter::TRACE,
        }
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl StoreConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the first existing default location, then
    /// apply environment variable overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::load_from_file(&path)?;
                break;
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;

        let config: StoreConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(PathBuf::from("<string>"), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the list of config file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./quadstore.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("quadstore").join("config.toml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/quadstore/config.toml"));

        paths
    }

    /// Apply `QUADSTORE_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("QUADSTORE_LOG_LEVEL").and_then(|v| LogLevel::from_str(&v)) {
            self.general.log_level = level;
        }
        if let Some(ms) = lookup("QUADSTORE_QUERY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.query.timeout_ms = ms;
        }
        if let Some(flag) = lookup("QUADSTORE_PARTIAL_RESULTS").and_then(|v| parse_bool(&v)) {
            self.query.partial_results = flag;
        }
        if let Some(flag) = lookup("QUADSTORE_OPTIMIZE_BGP").and_then(|v| parse_bool(&v)) {
            self.query.optimize_bgp = flag;
        }
        if let Some(ms) = lookup("QUADSTORE_UPDATE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.update.timeout_ms = ms;
        }
    }

    /// Check values that parse but make no sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.max_path_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "query.max_path_depth".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        for (prefix, namespace) in &self.prefixes {
            if !namespace.contains(':') {
                return Err(ConfigError::Invalid {
                    key: format!("prefixes.{}", prefix),
                    message: format!("'{}' is not an absolute IRI", namespace),
                });
            }
        }
        Ok(())
    }

    /// Serialize the configuration back to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            key: "<root>".to_string(),
            message: e.to_string(),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// IO error reading a config file
    #[error("IO error reading {path}: {1}", path = .0.display())]
    IoError(PathBuf, String),
    /// Parse error in a config file
    #[error("Parse error in {path}: {1}", path = .0.display())]
    ParseError(PathBuf, String),
    /// A value that parses but is not acceptable
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

// ============================================================================
// Tests
// ============================================================================
