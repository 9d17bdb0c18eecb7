//! Canned metadata values and container contract environments.

use std::collections::HashMap;

pub const PROJECT_ID: &str = "test-project";
pub const PROJECT_NUMBER: &str = "987654321";
pub const REGION: &str = "europe-west1";
pub const INSTANCE_ID: &str = "00bf4bf02d9a1c4a8e1f3b3f6c1e7a2b";
pub const SERVICE_ACCOUNT_EMAIL: &str = "runner@test-project.iam.gserviceaccount.com";

/// Region response as served by the metadata server.
#[must_use]
pub fn region_response() -> String {
    format!("projects/{PROJECT_NUMBER}/regions/{REGION}")
}

/// Builds a variable snapshot from pairs.
#[must_use]
pub fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Environment of a Cloud Run service revision.
#[must_use]
pub fn cloud_run_service_vars() -> HashMap<String, String> {
    vars(&[
        ("PORT", "8080"),
        ("K_SERVICE", "checkout"),
        ("K_REVISION", "checkout-00007-xyz"),
        ("K_CONFIGURATION", "checkout"),
    ])
}

/// Environment of a Cloud Run job task.
#[must_use]
pub fn cloud_run_job_vars() -> HashMap<String, String> {
    vars(&[
        ("CLOUD_RUN_JOB", "nightly-export"),
        ("CLOUD_RUN_EXECUTION", "nightly-export-x7k2p"),
        ("CLOUD_RUN_TASK_INDEX", "2"),
        ("CLOUD_RUN_TASK_ATTEMPT", "0"),
        ("CLOUD_RUN_TASK_COUNT", "4"),
    ])
}
