//! Server configuration.
//!
//! Settings specific to this binary. The Cloud Run service contract (`PORT`,
//! `K_*`, metadata) is loaded separately by `runcfg::Service`.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default greeting returned by `/`.
pub const DEFAULT_GREETING: &str = "Hello";

/// Default time allowed for in-flight requests to drain after a shutdown
/// signal. Cloud Run sends SIGKILL 10 seconds after SIGTERM.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECONDS: u64 = 10;

/// Default bound on configuration and metadata loading at startup.
pub const DEFAULT_STARTUP_TIMEOUT_SECONDS: u64 = 10;

/// Per-request timeout applied to every route.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Greeting returned by `/` (`GREETING`).
    pub greeting: String,

    /// Drain budget after a shutdown signal (`SHUTDOWN_TIMEOUT_SECONDS`).
    pub shutdown_timeout: Duration,

    /// Bound on startup loading (`STARTUP_TIMEOUT_SECONDS`).
    pub startup_timeout: Duration,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {var}: {reason}")]
    InvalidDuration { var: &'static str, reason: String },
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a timeout variable is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from a map of variables (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a timeout variable is not a positive integer.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let greeting = vars
            .get("GREETING")
            .filter(|g| !g.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_GREETING.to_string());

        let shutdown_timeout = seconds(
            vars,
            "SHUTDOWN_TIMEOUT_SECONDS",
            DEFAULT_SHUTDOWN_TIMEOUT_SECONDS,
        )?;
        let startup_timeout = seconds(
            vars,
            "STARTUP_TIMEOUT_SECONDS",
            DEFAULT_STARTUP_TIMEOUT_SECONDS,
        )?;

        Ok(Self {
            greeting,
            shutdown_timeout,
            startup_timeout,
        })
    }
}

fn seconds(
    vars: &HashMap<String, String>,
    var: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(var) else {
        return Ok(Duration::from_secs(default));
    };

    let value: u64 = value_str
        .parse()
        .map_err(|e| ConfigError::InvalidDuration {
            var,
            reason: format!("must be a valid positive integer, got '{value_str}': {e}"),
        })?;

    if value == 0 {
        return Err(ConfigError::InvalidDuration {
            var,
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(Duration::from_secs(value))
}
