//! Structured logging initialisation.
//!
//! Sets up a `tracing` subscriber with an [`EnvFilter`], a JSON or
//! pretty-print formatter and optionally a non-blocking writer.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `HIVE_LOG_LEVEL` | `info` | trace/debug/info/warn/error |
//! | `HIVE_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `HIVE_LOG_ASYNC` | `true` | buffer output on a background thread |
//! | `HIVE_LOG_FILTER` | unset | extra comma-separated directives, e.g. `hiverouter::router=debug` |
//! | `HIVE_LOG_LOCATION` | `false` | include file and line |
//!
//! `RUST_LOG`, when set, replaces the base level.

use crate::config::parse_bool;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a non-blocking background writer
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::default_prod()
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    /// Override fields from `HIVE_LOG_*` values returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("HIVE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = lookup("HIVE_LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Some(flag) = lookup("HIVE_LOG_ASYNC").as_deref().and_then(parse_bool) {
            self.async_logging = flag;
        }
        if let Some(filter) = lookup("HIVE_LOG_FILTER") {
            self.target_filter = Some(filter);
        }
        if let Some(flag) = lookup("HIVE_LOG_LOCATION").as_deref().and_then(parse_bool) {
            self.include_location = flag;
        }
    }

    /// Create a default configuration for development and tests
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    /// Create a default production configuration
    #[must_use]
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Build the [`EnvFilter`] for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid directive in
    /// `target_filter`.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        // Connection-level noise from the HTTP server; keep warnings.
        env_filter = env_filter.add_directive(
            "may_minihttp::http_server=warn"
                .parse()
                .context("invalid built-in log directive")?,
        );

        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',').map(str::trim) {
                if filter.is_empty() {
                    continue;
                }
                let directive = filter
                    .parse()
                    .with_context(|| format!("invalid log filter directive: {filter}"))?;
                env_filter = env_filter.add_directive(directive);
            }
        }
        Ok(env_filter)
    }
}

/// Initialize logging at `log_level`, taking everything else from the
/// environment.
///
/// # Errors
///
/// Fails when a global subscriber is already installed or a filter
/// directive is invalid.
///
/// # Example
///
/// ```no_run
/// hiverouter::logging::init_logging("info").expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: &str) -> Result<()> {
    let mut config = LogConfig::from_env();
    config.log_level = log_level.to_string();
    init_logging_with_config(&config)
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed or a filter
/// directive is invalid.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let env_filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());

        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_span_list(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(non_blocking)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(non_blocking)
                .boxed(),
        };

        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize async logging")?;

        // Keep the writer alive for the rest of the process.
        std::mem::forget(guard);
    } else {
        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_span_list(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
        };

        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize sync logging")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_config_defaults() {
        let dev = LogConfig::default_dev();
        assert_eq!(dev.log_level, "debug");
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(!dev.async_logging);
        assert!(dev.include_location);

        let prod = LogConfig::default();
        assert_eq!(prod, LogConfig::default_prod());
        assert_eq!(prod.format, LogFormat::Json);
        assert!(prod.async_logging);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HIVE_LOG_LEVEL", "warn"),
            ("HIVE_LOG_FORMAT", "pretty"),
            ("HIVE_LOG_ASYNC", "off"),
            ("HIVE_LOG_FILTER", "hiverouter::router=debug"),
            ("HIVE_LOG_LOCATION", "maybe"),
        ]
        .into_iter()
        .collect();

        let mut config = LogConfig::default_prod();
        config.apply_overrides(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.async_logging);
        assert_eq!(config.target_filter.as_deref(), Some("hiverouter::router=debug"));
        // Unparseable flags leave the default.
        assert!(!config.include_location);
    }

    #[test]
    fn test_env_filter_rejects_bad_directive() {
        let config = LogConfig {
            target_filter: Some("hiverouter=debug, =[".to_string()),
            ..LogConfig::default_dev()
        };
        assert!(config.env_filter().is_err());

        let config = LogConfig {
            target_filter: Some("hiverouter=debug,".to_string()),
            ..LogConfig::default_dev()
        };
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LogConfig = serde_json::from_str(r#"{"format": "pretty"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.log_level, "info");
    }
}
