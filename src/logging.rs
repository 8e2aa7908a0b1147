//! Logging setup for the binary and for anyone embedding the engine.
//!
//! The library itself only emits `tracing` events; nothing is printed until a
//! subscriber is installed with [`init`].
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard filter (e.g. `info`, `stockex_core=debug`), wins over `LOG_LEVEL`
//! - `LOG_LEVEL`: fallback level when `RUST_LOG` is unset
//! - `LOG_FORMAT`: `full` (default) or `compact`
//! - `LOG_TIMESTAMPS`: `true` (default) or `false`
//! - `LOG_THREAD_IDS`: `true` or `false` (default)

use std::env;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "compact" => LogFormat::Compact,
            _ => LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub default_level: String,
    pub timestamps: bool,
    pub include_target: bool,
    pub include_thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Full,
            default_level: "info".to_string(),
            timestamps: true,
            include_target: true,
            include_thread_ids: false,
        }
    }
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key).map(|s| s == "true" || s == "1").unwrap_or(default)
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            format: env::var("LOG_FORMAT").map(|s| LogFormat::parse(&s)).unwrap_or_default(),
            default_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            timestamps: flag("LOG_TIMESTAMPS", true),
            include_target: true,
            include_thread_ids: flag("LOG_THREAD_IDS", false),
        }
    }

    pub fn compact() -> Self {
        Self {
            format: LogFormat::Compact,
            include_target: false,
            ..Default::default()
        }
    }

    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to install log subscriber: {0}")]
pub struct LogInitError(String);

/// Install the global subscriber. Fails if one is already set.
pub fn init(config: &LogConfig) -> Result<(), LogInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids);

    let result = match (config.format, config.timestamps) {
        (LogFormat::Full, true) => builder.try_init(),
        (LogFormat::Full, false) => builder.without_time().try_init(),
        (LogFormat::Compact, true) => builder.compact().try_init(),
        (LogFormat::Compact, false) => builder.compact().without_time().try_init(),
    };
    result.map_err(|e| LogInitError(e.to_string()))
}
