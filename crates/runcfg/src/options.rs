//! Load options.
//!
//! [`LoadOptions`] is a builder applied before loading a [`Service`] or
//! [`Job`]. Each `with_*` call is applied in order, so a later call replaces
//! the effect of an earlier one. Methods taking several candidates keep the
//! first usable one, matching the environment candidate lists.
//!
//! Environment variables still win over every default set here.
//!
//! [`Service`]: crate::Service
//! [`Job`]: crate::Job

use crate::metadata::{Metadata, MetadataField};

/// Default listen port when neither `PORT` nor an option supplies one.
pub const DEFAULT_PORT: u16 = 8080;

/// Default task count for jobs.
pub const DEFAULT_TASK_COUNT: u32 = 1;

/// Options for [`Service::from_env`](crate::Service::from_env) and
/// [`Job::from_env`](crate::Job::from_env).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub(crate) port: u16,
    pub(crate) fields: MetadataField,
    pub(crate) metadata: Metadata,
    pub(crate) service_name: String,
    pub(crate) service_revision: String,
    pub(crate) service_configuration: String,
    pub(crate) job_name: String,
    pub(crate) job_execution: String,
    pub(crate) task_index: u32,
    pub(crate) task_attempt: u32,
    pub(crate) task_count: u32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            fields: MetadataField::ALL,
            metadata: Metadata::default(),
            service_name: String::new(),
            service_revision: String::new(),
            service_configuration: String::new(),
            job_name: String::new(),
            job_execution: String::new(),
            task_index: 0,
            task_attempt: 0,
            task_count: DEFAULT_TASK_COUNT,
        }
    }
}

/// First non-empty candidate, if any.
fn first_non_empty<S: AsRef<str>>(candidates: &[S]) -> Option<&str> {
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|candidate| !candidate.is_empty())
}

impl LoadOptions {
    /// Options with every default: port 8080, all metadata fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata fields to request from the metadata server.
    #[must_use]
    pub fn with_metadata(mut self, fields: MetadataField) -> Self {
        self.fields = fields;
        self
    }

    /// Default port used when `PORT` is unset. The first non-zero candidate
    /// wins; if all are zero the current default is kept.
    #[must_use]
    pub fn with_default_port(mut self, candidates: &[u16]) -> Self {
        if let Some(port) = candidates.iter().copied().find(|p| *p != 0) {
            self.port = port;
        }
        self
    }

    /// Like [`with_default_port`](Self::with_default_port) for textual
    /// candidates. The first candidate that parses to a non-zero port wins.
    #[must_use]
    pub fn with_default_port_str<S: AsRef<str>>(mut self, candidates: &[S]) -> Self {
        if let Some(port) = candidates
            .iter()
            .filter_map(|c| c.as_ref().trim().parse::<u16>().ok())
            .find(|p| *p != 0)
        {
            self.port = port;
        }
        self
    }

    /// Default service name used when `K_SERVICE` is unset.
    #[must_use]
    pub fn with_default_service_name<S: AsRef<str>>(mut self, candidates: &[S]) -> Self {
        if let Some(name) = first_non_empty(candidates) {
            self.service_name = name.to_string();
        }
        self
    }

    /// Default revision used when `K_REVISION` is unset.
    #[must_use]
    pub fn with_default_service_revision<S: AsRef<str>>(mut self, candidates: &[S]) -> Self {
        if let Some(revision) = first_non_empty(candidates) {
            self.service_revision = revision.to_string();
        }
        self
    }

    /// Default configuration used when `K_CONFIGURATION` is unset.
    #[must_use]
    pub fn with_default_service_configuration<S: AsRef<str>>(mut self, candidates: &[S]) -> Self {
        if let Some(configuration) = first_non_empty(candidates) {
            self.service_configuration = configuration.to_string();
        }
        self
    }

    /// Default job name used when `CLOUD_RUN_JOB` is unset.
    #[must_use]
    pub fn with_default_job_name<S: AsRef<str>>(mut self, candidates: &[S]) -> Self {
        if let Some(name) = first_non_empty(candidates) {
            self.job_name = name.to_string();
        }
        self
    }

    /// Default execution used when `CLOUD_RUN_EXECUTION` is unset.
    #[must_use]
    pub fn with_default_job_execution<S: AsRef<str>>(mut self, candidates: &[S]) -> Self {
        if let Some(execution) = first_non_empty(candidates) {
            self.job_execution = execution.to_string();
        }
        self
    }

    /// Default task index used when `CLOUD_RUN_TASK_INDEX` is unset.
    #[must_use]
    pub fn with_default_task_index(mut self, index: u32) -> Self {
        self.task_index = index;
        self
    }

    /// Default task attempt used when `CLOUD_RUN_TASK_ATTEMPT` is unset.
    #[must_use]
    pub fn with_default_task_attempt(mut self, attempt: u32) -> Self {
        self.task_attempt = attempt;
        self
    }

    /// Default task count used when `CLOUD_RUN_TASK_COUNT` is unset. The
    /// first non-zero candidate wins.
    #[must_use]
    pub fn with_default_task_count(mut self, candidates: &[u32]) -> Self {
        if let Some(count) = candidates.iter().copied().find(|c| *c != 0) {
            self.task_count = count;
        }
        self
    }

    /// Default value for one metadata field.
    ///
    /// A default skips the metadata server fetch for that field but loses to
    /// an environment override. The first non-empty candidate wins; `field`
    /// must name a single field, otherwise the call has no effect.
    #[must_use]
    pub fn with_default_metadata<S: AsRef<str>>(
        mut self,
        field: MetadataField,
        candidates: &[S],
    ) -> Self {
        if let Some(value) = first_non_empty(candidates) {
            self.metadata.set(field, value);
        }
        self
    }

    /// Shorthand for `with_default_metadata(MetadataField::PROJECT_ID, ..)`.
    #[must_use]
    pub fn with_default_project_id<S: AsRef<str>>(self, candidates: &[S]) -> Self {
        self.with_default_metadata(MetadataField::PROJECT_ID, candidates)
    }

    /// Shorthand for `with_default_metadata(MetadataField::PROJECT_NUMBER, ..)`.
    #[must_use]
    pub fn with_default_project_number<S: AsRef<str>>(self, candidates: &[S]) -> Self {
        self.with_default_metadata(MetadataField::PROJECT_NUMBER, candidates)
    }

    /// Shorthand for `with_default_metadata(MetadataField::REGION, ..)`.
    #[must_use]
    pub fn with_default_region<S: AsRef<str>>(self, candidates: &[S]) -> Self {
        self.with_default_metadata(MetadataField::REGION, candidates)
    }

    /// Port default currently in effect.
    #[must_use]
    pub fn default_port(&self) -> u16 {
        self.port
    }

    /// Metadata fields that will be requested.
    #[must_use]
    pub fn metadata_fields(&self) -> MetadataField {
        self.fields
    }
}
