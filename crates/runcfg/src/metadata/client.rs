//! Instance metadata server client.
//!
//! [`MetadataClient`] is the seam between the loader and the network: the
//! loader only ever calls the provided endpoint helpers, so tests can swap in
//! an in-memory implementation. [`HttpMetadataClient`] is the production
//! implementation backed by `reqwest`.
//!
//! # Endpoints
//!
//! | helper | path | response |
//! |---|---|---|
//! | `project_id` | `project/project-id` | bare string |
//! | `numeric_project_id` | `project/numeric-project-id` | bare string |
//! | `region` | `instance/region` | `projects/{number}/regions/{name}` |
//! | `instance_id` | `instance/id` | bare string |
//! | `service_account_email` | `instance/service-accounts/default/email` | bare string |

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Default metadata server host.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

/// Environment variable overriding the metadata server host.
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

/// Header every metadata request must carry.
pub const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";

/// Value of [`METADATA_FLAVOR_HEADER`].
pub const METADATA_FLAVOR_VALUE: &str = "Google";

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout. The metadata server is link-local.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) const PROJECT_ID_PATH: &str = "project/project-id";
pub(crate) const NUMERIC_PROJECT_ID_PATH: &str = "project/numeric-project-id";
pub(crate) const REGION_PATH: &str = "instance/region";
pub(crate) const INSTANCE_ID_PATH: &str = "instance/id";
pub(crate) const SERVICE_ACCOUNT_EMAIL_PATH: &str = "instance/service-accounts/default/email";

/// Errors returned by a [`MetadataClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataClientError {
    /// Transport-level failure (connection refused, timeout, DNS).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The metadata server does not define the requested key.
    #[error("metadata key not defined: {0}")]
    NotDefined(String),

    /// The metadata server answered with an unexpected status.
    #[error("unexpected status {status} for {path}")]
    Status { path: String, status: u16 },

    /// The response body could not be interpreted.
    #[error("malformed response for {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// The request was abandoned because the load was cancelled.
    #[error("request cancelled")]
    Cancelled,
}

/// Project number and region name, both parsed from `instance/region`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRegion {
    pub project_number: String,
    pub region: String,
}

impl InstanceRegion {
    /// Parse a `projects/{number}/regions/{name}` value.
    ///
    /// # Errors
    ///
    /// Returns `MetadataClientError::Malformed` if the value does not have
    /// that exact shape or the project number is not numeric.
    pub fn parse(raw: &str) -> Result<Self, MetadataClientError> {
        let malformed = |reason: &str| MetadataClientError::Malformed {
            path: REGION_PATH.to_string(),
            reason: format!("{reason}, got '{raw}'"),
        };

        let rest = raw
            .strip_prefix("projects/")
            .ok_or_else(|| malformed("expected 'projects/' prefix"))?;
        let (number, region) = rest
            .split_once("/regions/")
            .ok_or_else(|| malformed("expected '/regions/' segment"))?;

        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("project number must be numeric"));
        }
        if region.is_empty() || region.contains('/') {
            return Err(malformed("region name must be a single path segment"));
        }

        Ok(Self {
            project_number: number.to_string(),
            region: region.to_string(),
        })
    }
}

/// Read access to the instance metadata server.
///
/// Implementors provide [`MetadataClient::get`]; the endpoint helpers are
/// provided in terms of it.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Fetch the value at `path`, relative to `computeMetadata/v1/`.
    async fn get(&self, path: &str) -> Result<String, MetadataClientError>;

    /// Current project ID.
    async fn project_id(&self) -> Result<String, MetadataClientError> {
        self.get(PROJECT_ID_PATH).await
    }

    /// Current numeric project ID (project number).
    async fn numeric_project_id(&self) -> Result<String, MetadataClientError> {
        self.get(NUMERIC_PROJECT_ID_PATH).await
    }

    /// Instance region together with the project number.
    async fn region(&self) -> Result<InstanceRegion, MetadataClientError> {
        let raw = self.get(REGION_PATH).await?;
        InstanceRegion::parse(&raw)
    }

    /// Unique identifier of the running instance.
    async fn instance_id(&self) -> Result<String, MetadataClientError> {
        self.get(INSTANCE_ID_PATH).await
    }

    /// Email of the default service account.
    async fn service_account_email(&self) -> Result<String, MetadataClientError> {
        self.get(SERVICE_ACCOUNT_EMAIL_PATH).await
    }
}

/// `reqwest`-backed metadata client.
#[derive(Debug, Clone)]
pub struct HttpMetadataClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMetadataClient {
    /// Client for the host named by `GCE_METADATA_HOST`, or the default
    /// metadata server host when unset.
    ///
    /// # Errors
    ///
    /// Returns `MetadataClientError::Http` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, MetadataClientError> {
        let host = crate::env::first_env(&[METADATA_HOST_ENV]);
        let host = if host.is_empty() {
            DEFAULT_METADATA_HOST.to_string()
        } else {
            host
        };
        Self::with_base_url(format!("http://{host}/computeMetadata/v1"))
    }

    /// Client for an explicit base URL ending in `computeMetadata/v1`.
    ///
    /// # Errors
    ///
    /// Returns `MetadataClientError::Http` if the HTTP client cannot be built.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, MetadataClientError> {
        Self::with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Client for an explicit base URL with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns `MetadataClientError::Http` if the HTTP client cannot be built.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MetadataClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|e| MetadataClientError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn get(&self, path: &str) -> Result<String, MetadataClientError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        debug!(target: "runcfg.metadata", url = %url, "Requesting metadata");

        let response = self
            .http
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .send()
            .await
            .map_err(|e| {
                debug!(target: "runcfg.metadata", error = %e, "HTTP request failed");
                MetadataClientError::Http(e.to_string())
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataClientError::NotDefined(path.to_string()));
        }
        if !status.is_success() {
            warn!(
                target: "runcfg.metadata",
                path = %path,
                status = %status,
                "Unexpected response from metadata server"
            );
            return Err(MetadataClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MetadataClientError::Malformed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let value = body.trim();
        if value.is_empty() {
            return Err(MetadataClientError::Malformed {
                path: path.to_string(),
                reason: "empty response body".to_string(),
            });
        }

        Ok(value.to_string())
    }
}
