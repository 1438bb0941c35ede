//! Logging infrastructure for ItemSearch
//!
//! This module provides centralized logging configuration using the tracing
//! ecosystem.

use itemsearch_core::{ItemSearchError, LoggingSettings, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Crates whose output is capped at `warn`
const NOISY_TARGETS: &[&str] = &["hyper", "reqwest", "h2"];

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to use JSON format
    pub json_format: bool,
    /// Whether to include timestamps
    pub with_timestamps: bool,
    /// Whether to include file/line information
    pub with_file_info: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamps: true,
            with_file_info: false,
        }
    }
}

impl From<&LoggingSettings> for LoggerConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            json_format: settings.json,
            ..Self::default()
        }
    }
}

/// Initialize the global logger with the given configuration
pub fn init_logger(config: LoggerConfig) -> Result<()> {
    let level = LogLevel::parse(&config.level)?;

    let mut env_filter = EnvFilter::from_default_env().add_directive(level.into());
    for target in NOISY_TARGETS {
        env_filter = env_filter.add_directive(directive(&format!("{}=warn", target))?);
    }

    let fmt_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info)
            .boxed()
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info);

        if config.with_timestamps {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ItemSearchError::validation(format!("Failed to initialize logger: {}", e)))?;

    tracing::info!("Logger initialized with level: {}", config.level);
    Ok(())
}

fn directive(raw: &str) -> Result<Directive> {
    raw.parse()
        .map_err(|e| ItemSearchError::invalid_config(format!("Invalid log directive '{}': {}", raw, e)))
}

/// Initialize logger for testing (reduces noise)
pub fn init_test_logger() -> Result<()> {
    let config = LoggerConfig {
        level: "warn".to_string(),
        json_format: false,
        with_timestamps: false,
        with_file_info: false,
    };

    // Ignore errors if already initialized
    let _ = init_logger(config);
    Ok(())
}

/// Log level utilities
pub struct LogLevel;

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level: &str) -> Result<Level> {
        Level::from_str(level).map_err(|e| {
            ItemSearchError::invalid_config(format!("Invalid log level '{}': {}", level, e))
        })
    }

    pub fn all_levels() -> Vec<&'static str> {
        vec!["trace", "debug", "info", "warn", "error"]
    }

    /// Check if a log level string is valid
    pub fn is_valid(level: &str) -> bool {
        Self::all_levels().contains(&level.to_lowercase().as_str())
    }
}
