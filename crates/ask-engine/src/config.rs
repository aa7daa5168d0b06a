//! Configuration for the ask client.
//!
//! Settings live in `<data_dir>/config.json`; every field has a default, so
//! a missing file is the same as an empty object.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default path of the endpoint on a base URL.
pub const DEFAULT_ENDPOINT_PATH: &str = "/api/ask";

/// Name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint the questions are posted to.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// History file, relative to the data directory unless absolute.
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    /// Optional overall request timeout. None waits indefinitely.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_api_url() -> String {
    format!("http://127.0.0.1:3000{DEFAULT_ENDPOINT_PATH}")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("chat_history.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            history_file: default_history_file(),
            request_timeout_seconds: None,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// Resolve the endpoint URL, preferring `override_url` (flag or
    /// environment) over the configured one. A bare base URL gets the
    /// default endpoint path appended.
    pub fn endpoint_url(&self, override_url: Option<&str>) -> Result<String, ConfigError> {
        let raw = override_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.api_url);
        normalize_endpoint(raw)
    }

    /// Full path of the history file.
    pub fn history_path(&self, data_dir: &Path) -> PathBuf {
        if self.history_file.is_absolute() {
            self.history_file.clone()
        } else {
            data_dir.join(&self.history_file)
        }
    }

    /// Request timeout, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

/// Default data directory (`<platform data dir>/ask`).
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("ask"))
}

fn normalize_endpoint(raw: &str) -> Result<String, ConfigError> {
    let mut url =
        reqwest::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "{raw}: unsupported scheme {}",
            url.scheme()
        )));
    }

    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_ENDPOINT_PATH);
    }

    Ok(url.to_string())
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Endpoint URL could not be used.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}
