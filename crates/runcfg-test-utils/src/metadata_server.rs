//! Mock metadata server.
//!
//! Provides `MockMetadataServer`, a wiremock server answering the
//! `computeMetadata/v1` endpoints. Every mounted endpoint requires the
//! `Metadata-Flavor: Google` header, as the real server does.

use crate::fixtures::{
    region_response, INSTANCE_ID, PROJECT_ID, PROJECT_NUMBER, SERVICE_ACCOUNT_EMAIL,
};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Endpoint paths relative to the metadata base URL.
pub mod paths {
    pub const PROJECT_ID: &str = "project/project-id";
    pub const NUMERIC_PROJECT_ID: &str = "project/numeric-project-id";
    pub const REGION: &str = "instance/region";
    pub const INSTANCE_ID: &str = "instance/id";
    pub const SERVICE_ACCOUNT_EMAIL: &str = "instance/service-accounts/default/email";
}

const PREFIX: &str = "/computeMetadata/v1/";

/// Test harness for a metadata server.
///
/// # Example
/// ```rust,ignore
/// let server = MockMetadataServer::start().await;
/// server.mount_status(paths::INSTANCE_ID, 503).await;
/// ```
pub struct MockMetadataServer {
    server: MockServer,
}

impl MockMetadataServer {
    /// Start a server with nothing mounted. Unmounted paths answer 404.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start a server answering every endpoint with the fixture values.
    pub async fn healthy() -> Self {
        Self::healthy_except(&[]).await
    }

    /// Like [`healthy`](Self::healthy) but leaves `skip` unmounted so the
    /// test can mount its own response. Mocks match in mount order, so a
    /// later mount cannot replace an earlier one.
    pub async fn healthy_except(skip: &[&str]) -> Self {
        let server = Self::start().await;
        let region = region_response();
        let values = [
            (paths::PROJECT_ID, PROJECT_ID),
            (paths::NUMERIC_PROJECT_ID, PROJECT_NUMBER),
            (paths::REGION, region.as_str()),
            (paths::INSTANCE_ID, INSTANCE_ID),
            (paths::SERVICE_ACCOUNT_EMAIL, SERVICE_ACCOUNT_EMAIL),
        ];
        for (endpoint, value) in values {
            if !skip.contains(&endpoint) {
                server.mount_value(endpoint, value).await;
            }
        }
        server
    }

    /// Base URL to hand to the metadata client.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}/computeMetadata/v1", self.server.uri())
    }

    /// Answer `endpoint` with `body`.
    pub async fn mount_value(&self, endpoint: &str, body: &str) {
        self.mount(endpoint, ResponseTemplate::new(200).set_body_string(body))
            .await;
    }

    /// Answer `endpoint` with `body` after `delay`.
    pub async fn mount_delayed(&self, endpoint: &str, body: &str, delay: Duration) {
        self.mount(
            endpoint,
            ResponseTemplate::new(200)
                .set_body_string(body)
                .set_delay(delay),
        )
        .await;
    }

    /// Answer `endpoint` with an empty response of `status`.
    pub async fn mount_status(&self, endpoint: &str, status: u16) {
        self.mount(endpoint, ResponseTemplate::new(status)).await;
    }

    async fn mount(&self, endpoint: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("{PREFIX}{endpoint}")))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for `endpoint`.
    pub async fn received(&self, endpoint: &str) -> usize {
        let full = format!("{PREFIX}{endpoint}");
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == full)
            .count()
    }

    /// Number of requests received across all endpoints.
    pub async fn received_total(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
