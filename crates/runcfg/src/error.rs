//! Error types for configuration loading.
//!
//! Three categories surface to callers:
//! - `EnvironmentProcess`: a numeric environment variable did not parse
//! - `InvalidPort`: the port resolved to exactly 0
//! - `MetadataFetch`: one or more metadata server requests failed; every
//!   per-field cause is preserved
//!
//! No loader retries internally. Retry policy belongs to the caller.

use crate::metadata::{FetchTarget, MetadataClientError};
use thiserror::Error;

/// Errors returned by the service, job and metadata loaders.
#[derive(Error, Debug)]
pub enum RuncfgError {
    /// A numeric environment variable could not be parsed.
    #[error(
        "failed to process configuration from environment variables: invalid {var} value '{value}': {reason}"
    )]
    EnvironmentProcess {
        var: String,
        value: String,
        reason: String,
    },

    /// The port resolved to 0.
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// One or more metadata fetches failed.
    #[error("failed to fetch metadata from server: {0}")]
    MetadataFetch(#[from] MetadataFetchError),

    /// The metadata client could not be constructed.
    #[error("failed to build metadata client: {0}")]
    Client(MetadataClientError),
}

impl RuncfgError {
    /// Name of the environment variable that failed to parse, if any.
    #[must_use]
    pub fn env_var(&self) -> Option<&str> {
        match self {
            RuncfgError::EnvironmentProcess { var, .. } => Some(var),
            _ => None,
        }
    }
}

/// A single failed metadata fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to fetch {target}: {source}")]
pub struct FieldFetchError {
    /// Which fetch failed.
    pub target: FetchTarget,
    /// Underlying client error.
    pub source: MetadataClientError,
}

/// Aggregate of every failed fetch in one load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_errors(.errors))]
pub struct MetadataFetchError {
    errors: Vec<FieldFetchError>,
}

impl MetadataFetchError {
    pub(crate) fn new(errors: Vec<FieldFetchError>) -> Self {
        Self { errors }
    }

    /// Every per-fetch failure, in completion order.
    #[must_use]
    pub fn errors(&self) -> &[FieldFetchError] {
        &self.errors
    }

    /// True if the fetch for `target` is among the failures.
    #[must_use]
    pub fn failed(&self, target: FetchTarget) -> bool {
        self.errors.iter().any(|e| e.target == target)
    }
}

fn join_errors(errors: &[FieldFetchError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
