//! Configuration file parser for ~/.config/newswire/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields`
//! off), though we log a warning when the file contains potential typos.
use std::collections::BTreeMap;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::SourceConfig;

/// Environment variable consulted for the conversion-backend credential.
/// Takes precedence over the config file.
pub const API_KEY_ENV: &str = "NEWSWIRE_API_KEY";

/// Stock feed-conversion backend.
pub const DEFAULT_CONVERT_ENDPOINT: &str = "https://api.rss2json.com/v1/api.json";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
///
/// Custom Debug impl masks `feed_api_key` to prevent secret leakage in logs,
/// error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed-conversion backend URL.
    pub convert_endpoint: String,

    /// Conversion-backend API key (alternative to the env var).
    /// Env var takes precedence over config file.
    pub feed_api_key: Option<String>,

    /// Database file path. Defaults to the platform data directory.
    pub database: Option<String>,

    /// Source catalog overrides: `[sources.<name>]` tables with an `all`
    /// list plus `<Category> = <url>` entries. A configured source replaces
    /// the built-in one of the same name.
    pub sources: BTreeMap<String, SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            convert_endpoint: DEFAULT_CONVERT_ENDPOINT.to_string(),
            feed_api_key: None,
            database: None,
            sources: BTreeMap::new(),
        }
    }
}

/// Mask feed_api_key in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("convert_endpoint", &self.convert_endpoint)
            .field(
                "feed_api_key",
                &self.feed_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("database", &self.database)
            .field("sources", &self.sources.keys())
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["convert_endpoint", "feed_api_key", "database", "sources"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), endpoint = %config.convert_endpoint, "Loaded configuration");
        Ok(config)
    }

    /// Resolve the conversion-backend credential: env var first, config
    /// second, `None` when neither is set (the backend's free tier).
    pub fn api_key(&self) -> Option<SecretString> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.feed_api_key.clone())
            .map(SecretString::from)
    }
}

// ============================================================================
// Tests
// ============================================================================
