//! Configuration file parser for ~/.config/reddittweeter/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos. Command-line flags are applied on top by the
//! binary before the settings structs are built.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{FeedFormat, ParseOptions};
use crate::format::{FormatOptions, DEFAULT_MAX_LENGTH, DEFAULT_SHORT_LINK_BASE};
use crate::publish::DEFAULT_API_BASE_URL;
use crate::session::{SessionSettings, DEFAULT_MAX_POSTS, DEFAULT_RETENTION_DAYS};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite dedup database.
    pub database_path: PathBuf,

    /// Hard limit on post length, in characters.
    pub max_length: usize,

    /// Maximum number of items published per run.
    pub max_posts: usize,

    /// Dedup records older than this many days are deleted.
    pub retention_days: u32,

    /// Pause between two publishes, in milliseconds.
    pub post_delay_ms: u64,

    /// Drop items flagged adult-only.
    pub filter_adult: bool,

    /// Payload format of the source URL (`auto`, `json` or `rss`).
    pub feed_format: FeedFormat,

    /// Host used for short item links in posts.
    pub short_link_base: String,

    /// User-Agent sent with the feed request.
    pub user_agent: String,

    /// Base URL of the microblogging API.
    pub api_base_url: String,

    /// Log every skip and publish decision.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("reddittweeter.db"),
            max_length: DEFAULT_MAX_LENGTH,
            max_posts: DEFAULT_MAX_POSTS,
            retention_days: DEFAULT_RETENTION_DAYS,
            post_delay_ms: 1000,
            filter_adult: true,
            feed_format: FeedFormat::Auto,
            short_link_base: DEFAULT_SHORT_LINK_BASE.to_string(),
            user_agent: "reddittweeter".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            verbose: false,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 11] = [
        "database_path",
        "max_length",
        "max_posts",
        "retention_days",
        "post_delay_ms",
        "filter_adult",
        "feed_format",
        "short_link_base",
        "user_agent",
        "api_base_url",
        "verbose",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading
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
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            database = %config.database_path.display(),
            max_posts = config.max_posts,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            filter_adult: self.filter_adult,
        }
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            max_length: self.max_length,
            short_link_base: self.short_link_base.clone(),
        }
    }

    /// Settings for one run of the session driver.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_posts: self.max_posts,
            post_delay: Duration::from_millis(self.post_delay_ms),
            retention_days: self.retention_days,
            feed_format: self.feed_format,
            parse: self.parse_options(),
            format: self.format_options(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
