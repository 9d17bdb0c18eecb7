//! Telemetry resource attributes.
//!
//! A [`Resource`] is the attribute set describing the process emitting
//! telemetry, keyed by OpenTelemetry semantic conventions. It is built from a
//! loaded [`Service`] or [`Job`] and handed to whatever exporter the caller
//! wires up; [`init_metrics_recorder`](super::metrics::init_metrics_recorder)
//! turns it into global metric labels.
//!
//! Attributes with empty values are omitted.

use crate::job::Job;
use crate::service::Service;
use std::collections::BTreeMap;

pub const CLOUD_PROVIDER: &str = "cloud.provider";
pub const CLOUD_PLATFORM: &str = "cloud.platform";
pub const CLOUD_ACCOUNT_ID: &str = "cloud.account.id";
pub const CLOUD_REGION: &str = "cloud.region";
pub const FAAS_NAME: &str = "faas.name";
pub const FAAS_VERSION: &str = "faas.version";
pub const FAAS_INSTANCE: &str = "faas.instance";
pub const JOB_EXECUTION: &str = "gcp.cloud_run.job.execution";
pub const JOB_TASK_INDEX: &str = "gcp.cloud_run.job.task_index";

const PROVIDER_GCP: &str = "gcp";
const PLATFORM_CLOUD_RUN: &str = "gcp_cloud_run";

/// Ordered telemetry resource attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    attributes: BTreeMap<String, String>,
}

impl Resource {
    /// Resource describing a Cloud Run service instance.
    #[must_use]
    pub fn for_service(service: &Service) -> Self {
        Self::cloud_run(&service.metadata.project_id, &service.metadata.region)
            .with_attribute(FAAS_NAME, &service.name)
            .with_attribute(FAAS_VERSION, &service.revision)
            .with_attribute(FAAS_INSTANCE, &service.metadata.instance_id)
    }

    /// Resource describing a Cloud Run job task.
    #[must_use]
    pub fn for_job(job: &Job) -> Self {
        Self::cloud_run(&job.metadata.project_id, &job.metadata.region)
            .with_attribute(FAAS_NAME, &job.name)
            .with_attribute(FAAS_INSTANCE, &job.metadata.instance_id)
            .with_attribute(JOB_EXECUTION, &job.execution)
            .with_attribute(JOB_TASK_INDEX, job.task_index.to_string())
    }

    fn cloud_run(project_id: &str, region: &str) -> Self {
        Self::default()
            .with_attribute(CLOUD_PROVIDER, PROVIDER_GCP)
            .with_attribute(CLOUD_PLATFORM, PLATFORM_CLOUD_RUN)
            .with_attribute(CLOUD_ACCOUNT_ID, project_id)
            .with_attribute(CLOUD_REGION, region)
    }

    /// Add or replace an attribute. Empty values are ignored.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.attributes.insert(key.into(), value);
        }
        self
    }

    /// Value of one attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// All attributes, ordered by key.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}
