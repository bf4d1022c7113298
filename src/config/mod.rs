//! Configuration types and loading for the relay.

use crate::error::RelayError;
use serde::Deserialize;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default dnsrelay.yaml embedded at compile time
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../dnsrelay.yaml");

/// File name searched for when no path is given
pub const CONFIG_FILE_NAME: &str = "dnsrelay.yaml";

/// Main configuration struct for the relay
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Upstream resolver as `host:port`
    #[serde(default = "default_upstream")]
    pub upstream: String,
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
    /// Drop upstream replies that arrive from any other address
    #[serde(default = "default_verify_upstream_source")]
    pub verify_upstream_source: bool,
    /// Address used in synthesized A records
    #[serde(default = "default_fallback_address")]
    pub fallback_address: Ipv4Addr,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: default_listen(),
            upstream: default_upstream(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            verify_upstream_source: default_verify_upstream_source(),
            fallback_address: default_fallback_address(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Parse `listen` into a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, RelayError> {
        self.listen
            .parse()
            .map_err(|e| RelayError::Config(format!("invalid listen address '{}': {}", self.listen, e)))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

// ============== Logging Config ==============

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log every query and response, not just failures
    #[serde(default = "default_log_queries")]
    pub log_queries: bool,
    #[serde(default)]
    pub format: LogFormat,
    /// File logging configuration
    #[serde(default)]
    pub file: Option<FileLoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileLoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
    #[serde(default)]
    pub rotation: LogRotation,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_file_prefix() -> String {
    "dnsrelay.log".to_string()
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        FileLoggingConfig {
            log_dir: default_log_dir(),
            file_prefix: default_log_file_prefix(),
            rotation: LogRotation::Daily,
        }
    }
}

fn default_log_queries() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_queries: default_log_queries(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

// ============== Default Values ==============

pub fn default_listen() -> String {
    "127.0.0.1:2053".to_string()
}

pub fn default_upstream() -> String {
    "8.8.8.8:53".to_string()
}

pub fn default_upstream_timeout_ms() -> u64 {
    2000
}

pub fn default_verify_upstream_source() -> bool {
    true
}

pub fn default_fallback_address() -> Ipv4Addr {
    Ipv4Addr::new(8, 8, 8, 8)
}

// ============== Config Loading ==============

/// Get the directory containing the executable
fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// Parse a YAML document into a config.
pub fn parse_config(content: &str) -> Result<Config, RelayError> {
    serde_yaml_ng::from_str(content).map_err(|e| RelayError::Config(e.to_string()))
}

/// Load configuration from file
///
/// An explicit path that does not exist falls back to defaults, like a
/// missing `dnsrelay.yaml`. A file that exists but does not parse is an error.
pub fn load_config(path: Option<&str>) -> Result<Config, RelayError> {
    let config_paths = if let Some(p) = path {
        vec![PathBuf::from(p)]
    } else {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = exe_dir() {
            paths.push(dir.join(CONFIG_FILE_NAME));
        }
        paths
    };

    for config_path in config_paths {
        if config_path.exists() {
            println!("Loading config from: {}", config_path.display());
            let content = fs::read_to_string(&config_path)?;
            return parse_config(&content);
        }
    }

    Ok(Config::default())
}

// ============== Unit Tests ==============
