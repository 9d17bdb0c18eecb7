//! Cloud Run job configuration.
//!
//! Reads the job container contract:
//! - `CLOUD_RUN_JOB`, `CLOUD_RUN_EXECUTION` - job identity
//! - `CLOUD_RUN_TASK_INDEX`, `CLOUD_RUN_TASK_ATTEMPT`,
//!   `CLOUD_RUN_TASK_COUNT` - task identity, unsigned 32-bit
//!
//! and resolves the embedded [`Metadata`] through a [`MetadataLoader`].

use crate::env::{parse_var, snapshot, var_or};
use crate::error::RuncfgError;
use crate::metadata::{Metadata, MetadataLoader};
use crate::options::LoadOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Configuration of a running Cloud Run job task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Platform metadata for the instance.
    pub metadata: Metadata,

    /// Name of the job being run (`CLOUD_RUN_JOB`).
    pub name: String,

    /// Name of the execution being run (`CLOUD_RUN_EXECUTION`).
    pub execution: String,

    /// Index of this task, from 0 to `task_count - 1`.
    pub task_index: u32,

    /// Number of times this task has been retried, starting at 0.
    pub task_attempt: u32,

    /// Number of tasks defined in the execution. Defaults to 1.
    pub task_count: u32,
}

impl Job {
    /// Load the job configuration from the process environment.
    ///
    /// # Errors
    ///
    /// - `EnvironmentProcess` if a `CLOUD_RUN_TASK_*` variable is not an
    ///   unsigned 32-bit integer
    /// - `MetadataFetch` if any metadata fetch fails
    pub async fn from_env(
        loader: &MetadataLoader,
        cancel: &CancellationToken,
        opts: LoadOptions,
    ) -> Result<Self, RuncfgError> {
        Self::from_vars(&snapshot(), loader, cancel, opts).await
    }

    /// Load the job configuration from `vars`.
    ///
    /// # Errors
    ///
    /// Same as [`Job::from_env`].
    #[instrument(skip_all)]
    pub async fn from_vars(
        vars: &HashMap<String, String>,
        loader: &MetadataLoader,
        cancel: &CancellationToken,
        opts: LoadOptions,
    ) -> Result<Self, RuncfgError> {
        let task_index = parse_var(vars, "CLOUD_RUN_TASK_INDEX")?.unwrap_or(opts.task_index);
        let task_attempt = parse_var(vars, "CLOUD_RUN_TASK_ATTEMPT")?.unwrap_or(opts.task_attempt);
        let task_count = parse_var(vars, "CLOUD_RUN_TASK_COUNT")?.unwrap_or(opts.task_count);

        let name = var_or(vars, "CLOUD_RUN_JOB", &opts.job_name);
        let execution = var_or(vars, "CLOUD_RUN_EXECUTION", &opts.job_execution);

        let metadata = loader
            .resolve(
                vars,
                cancel,
                opts.fields,
                &Metadata::default(),
                &opts.metadata,
            )
            .await?;

        debug!(
            target: "runcfg.job",
            job = %name,
            execution = %execution,
            task_index,
            task_count,
            "Job configuration loaded"
        );

        Ok(Self {
            metadata,
            name,
            execution,
            task_index,
            task_attempt,
            task_count,
        })
    }
}
