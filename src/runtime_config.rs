//! # Runtime Configuration
//!
//! Coroutine runtime settings read from the environment.
//!
//! ## Environment Variables
//!
//! ### `HIVE_STACK_SIZE`
//!
//! Stack size for each request coroutine. Accepts decimal (`16384`) or
//! hexadecimal (`0x4000`). Default: `0x4000` (16 KB).
//!
//! Memory use is roughly `stack_size × concurrent requests`; raise it for
//! handlers with deep call chains or large locals.
//!
//! ### `HIVE_WORKERS`
//!
//! Number of scheduler worker threads. Defaults to the number of CPUs.
//!
//! ## Usage
//!
//! ```rust
//! use hiverouter::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;

/// Default coroutine stack size (16 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    /// Scheduler worker threads; `None` keeps the runtime default
    pub workers: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: None,
        }
    }
}

/// Parse `0x`-prefixed hex or decimal. Returns `None` for anything else.
#[must_use]
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Unparseable
    /// values fall back to the defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let stack_size = lookup("HIVE_STACK_SIZE")
            .as_deref()
            .and_then(parse_size)
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_STACK_SIZE);
        let workers = lookup("HIVE_WORKERS")
            .as_deref()
            .and_then(parse_size)
            .filter(|&n| n > 0);
        RuntimeConfig {
            stack_size,
            workers,
        }
    }

    /// Push these settings into the global `may` scheduler. Must run
    /// before the first coroutine is spawned.
    pub fn apply(&self) {
        let config = may::config();
        config.set_stack_size(self.stack_size);
        if let Some(workers) = self.workers {
            config.set_workers(workers);
        }
        tracing::debug!(
            stack_size = self.stack_size,
            workers = ?self.workers,
            "Coroutine runtime configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("0x8000"), Some(0x8000));
        assert_eq!(parse_size("0X10"), Some(16));
        assert_eq!(parse_size(" 32768 "), Some(32768));
        assert_eq!(parse_size("big"), None);
        assert_eq!(parse_size("0xZZ"), None);
    }

    #[test]
    fn test_from_lookup() {
        let config = RuntimeConfig::from_lookup(|k| match k {
            "HIVE_STACK_SIZE" => Some("0x8000".to_string()),
            "HIVE_WORKERS" => Some("4".to_string()),
            _ => None,
        });
        assert_eq!(config.stack_size, 0x8000);
        assert_eq!(config.workers, Some(4));
    }

    #[test]
    fn test_defaults_on_bad_values() {
        let config = RuntimeConfig::from_lookup(|k| match k {
            "HIVE_STACK_SIZE" => Some("0".to_string()),
            "HIVE_WORKERS" => Some("many".to_string()),
            _ => None,
        });
        assert_eq!(config, RuntimeConfig::default());
    }
}
