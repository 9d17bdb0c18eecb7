//! Instance metadata loading.
//!
//! Resolves a [`Metadata`] record by merging environment overrides with
//! concurrent fetches from the metadata server.
//!
//! # Resolution order (per field)
//!
//! ```text
//! prior value (reload) → env override → option default → metadata server
//! ```
//!
//! - A non-empty prior value is never touched.
//! - An env override always wins over a fetch, whether or not the field was
//!   requested. Supplying an override is an explicit signal of intent.
//! - Only requested fields that are still empty are fetched.
//! - When both region and project number need fetching, a single
//!   `instance/region` request answers both.
//!
//! # Concurrency
//!
//! One task per fetch (at most four) runs on the Tokio runtime under a child
//! of the caller's `CancellationToken`. The first failing task cancels the
//! child so its siblings stop early. The loader waits for every task before
//! returning. Tasks return their values and the loader merges them, so no
//! field is shared between tasks.
//!
//! No timeout is imposed here. Bound the load with the caller's token or
//! `tokio::time::timeout`.

mod client;
mod field;
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod mock;

pub use client::{
    HttpMetadataClient, InstanceRegion, MetadataClient, MetadataClientError,
    DEFAULT_HTTP_TIMEOUT, DEFAULT_METADATA_HOST, METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE,
    METADATA_HOST_ENV,
};
pub use field::MetadataField;

use crate::env::{first_var, snapshot};
use crate::error::{FieldFetchError, MetadataFetchError, RuncfgError};
use crate::observability::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Platform identity facts for the running instance.
///
/// Every field defaults to empty. A field is only populated when it was
/// resolved from an override, a default, or the metadata server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Project ID of the project the service or job belongs to.
    pub project_id: String,

    /// Project number of the project the service or job belongs to.
    pub project_number: String,

    /// Region the instance runs in.
    pub region: String,

    /// Unique identifier of the instance (also available in logs).
    pub instance_id: String,

    /// Email of the service identity.
    pub service_account_email: String,
}

impl Metadata {
    /// Value of a single field, or `None` for `NONE`/`ALL`/combined sets.
    #[must_use]
    pub fn get(&self, field: MetadataField) -> Option<&str> {
        match field {
            MetadataField::PROJECT_ID => Some(&self.project_id),
            MetadataField::PROJECT_NUMBER => Some(&self.project_number),
            MetadataField::REGION => Some(&self.region),
            MetadataField::INSTANCE_ID => Some(&self.instance_id),
            MetadataField::SERVICE_ACCOUNT_EMAIL => Some(&self.service_account_email),
            _ => None,
        }
    }

    fn slot_mut(&mut self, field: MetadataField) -> Option<&mut String> {
        match field {
            MetadataField::PROJECT_ID => Some(&mut self.project_id),
            MetadataField::PROJECT_NUMBER => Some(&mut self.project_number),
            MetadataField::REGION => Some(&mut self.region),
            MetadataField::INSTANCE_ID => Some(&mut self.instance_id),
            MetadataField::SERVICE_ACCOUNT_EMAIL => Some(&mut self.service_account_email),
            _ => None,
        }
    }

    /// Set a single field. Ignored for `NONE`/`ALL`/combined sets.
    pub fn set(&mut self, field: MetadataField, value: impl Into<String>) {
        if let Some(slot) = self.slot_mut(field) {
            *slot = value.into();
        }
    }

    /// Fields that currently hold a non-empty value.
    #[must_use]
    pub fn populated(&self) -> MetadataField {
        MetadataField::FIELDS
            .iter()
            .filter(|field| self.get(**field).is_some_and(|v| !v.is_empty()))
            .fold(MetadataField::NONE, |acc, field| acc | *field)
    }
}

/// Candidate environment variable names per metadata field.
///
/// Names are checked in order and the first non-empty value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    pub project_id: Vec<String>,
    pub project_number: Vec<String>,
    pub region: Vec<String>,
    pub instance_id: Vec<String>,
    pub service_account_email: Vec<String>,
}

impl Default for EnvOverrides {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| (*s).to_string()).collect()
        }

        Self {
            project_id: names(&["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCP_PROJECT_ID"]),
            project_number: names(&["GCP_PROJECT_NUMBER"]),
            region: names(&["CLOUDSDK_COMPUTE_REGION", "GCP_REGION"]),
            instance_id: names(&["CLOUD_RUN_INSTANCE_ID"]),
            service_account_email: names(&["GOOGLE_SERVICE_ACCOUNT_EMAIL"]),
        }
    }
}

impl EnvOverrides {
    /// Override lists with no candidates at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            project_id: Vec::new(),
            project_number: Vec::new(),
            region: Vec::new(),
            instance_id: Vec::new(),
            service_account_email: Vec::new(),
        }
    }

    /// Candidate names for a single field.
    #[must_use]
    pub fn names(&self, field: MetadataField) -> &[String] {
        match field {
            MetadataField::PROJECT_ID => &self.project_id,
            MetadataField::PROJECT_NUMBER => &self.project_number,
            MetadataField::REGION => &self.region,
            MetadataField::INSTANCE_ID => &self.instance_id,
            MetadataField::SERVICE_ACCOUNT_EMAIL => &self.service_account_email,
            _ => &[],
        }
    }

    /// Replace the candidate names for a single field.
    #[must_use]
    pub fn with_names<S: Into<String>>(
        mut self,
        field: MetadataField,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        match field {
            MetadataField::PROJECT_ID => self.project_id = names,
            MetadataField::PROJECT_NUMBER => self.project_number = names,
            MetadataField::REGION => self.region = names,
            MetadataField::INSTANCE_ID => self.instance_id = names,
            MetadataField::SERVICE_ACCOUNT_EMAIL => self.service_account_email = names,
            _ => {}
        }
        self
    }
}

/// One metadata server request issued by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    /// `project/project-id`
    ProjectId,
    /// `project/numeric-project-id`
    ProjectNumber,
    /// `instance/region`, region only
    Region,
    /// `instance/region`, region and project number together
    RegionAndProjectNumber,
    /// `instance/id`
    InstanceId,
    /// `instance/service-accounts/default/email`
    ServiceAccountEmail,
}

impl FetchTarget {
    /// Metric/log label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FetchTarget::ProjectId => "project_id",
            FetchTarget::ProjectNumber => "project_number",
            FetchTarget::Region => "region",
            FetchTarget::RegionAndProjectNumber => "region_and_project_number",
            FetchTarget::InstanceId => "instance_id",
            FetchTarget::ServiceAccountEmail => "service_account_email",
        }
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchTarget::ProjectId => "project ID",
            FetchTarget::ProjectNumber => "project number",
            FetchTarget::Region => "region",
            FetchTarget::RegionAndProjectNumber => "region and project number",
            FetchTarget::InstanceId => "instance ID",
            FetchTarget::ServiceAccountEmail => "service account email",
        })
    }
}

/// Fetches required for the requested fields that are still empty.
fn plan_fetches(requested: MetadataField, resolved: &Metadata) -> Vec<FetchTarget> {
    let needs = |field: MetadataField| {
        requested.contains(field) && resolved.get(field).is_some_and(str::is_empty)
    };

    let mut plan = Vec::with_capacity(4);
    if needs(MetadataField::PROJECT_ID) {
        plan.push(FetchTarget::ProjectId);
    }
    match (needs(MetadataField::REGION), needs(MetadataField::PROJECT_NUMBER)) {
        (true, true) => plan.push(FetchTarget::RegionAndProjectNumber),
        (true, false) => plan.push(FetchTarget::Region),
        (false, true) => plan.push(FetchTarget::ProjectNumber),
        (false, false) => {}
    }
    if needs(MetadataField::INSTANCE_ID) {
        plan.push(FetchTarget::InstanceId);
    }
    if needs(MetadataField::SERVICE_ACCOUNT_EMAIL) {
        plan.push(FetchTarget::ServiceAccountEmail);
    }
    plan
}

type Fetched = Vec<(MetadataField, String)>;

async fn fetch(
    client: &dyn MetadataClient,
    target: FetchTarget,
) -> Result<Fetched, MetadataClientError> {
    Ok(match target {
        FetchTarget::ProjectId => vec![(MetadataField::PROJECT_ID, client.project_id().await?)],
        FetchTarget::ProjectNumber => vec![(
            MetadataField::PROJECT_NUMBER,
            client.numeric_project_id().await?,
        )],
        FetchTarget::Region => vec![(MetadataField::REGION, client.region().await?.region)],
        FetchTarget::RegionAndProjectNumber => {
            let region = client.region().await?;
            vec![
                (MetadataField::REGION, region.region),
                (MetadataField::PROJECT_NUMBER, region.project_number),
            ]
        }
        FetchTarget::InstanceId => vec![(MetadataField::INSTANCE_ID, client.instance_id().await?)],
        FetchTarget::ServiceAccountEmail => vec![(
            MetadataField::SERVICE_ACCOUNT_EMAIL,
            client.service_account_email().await?,
        )],
    })
}

/// Concurrent metadata loader.
///
/// Owns the metadata client and the override name lists. Cheap to clone.
#[derive(Clone)]
pub struct MetadataLoader {
    client: Arc<dyn MetadataClient>,
    overrides: EnvOverrides,
}

impl fmt::Debug for MetadataLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataLoader")
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl MetadataLoader {
    /// Loader backed by [`HttpMetadataClient::new`] with default overrides.
    ///
    /// # Errors
    ///
    /// Returns `RuncfgError::Client` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, RuncfgError> {
        let client = HttpMetadataClient::new().map_err(RuncfgError::Client)?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Loader backed by an arbitrary client with default overrides.
    #[must_use]
    pub fn with_client(client: Arc<dyn MetadataClient>) -> Self {
        Self {
            client,
            overrides: EnvOverrides::default(),
        }
    }

    /// Replace the override name lists.
    #[must_use]
    pub fn with_overrides(mut self, overrides: EnvOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Override name lists in use.
    #[must_use]
    pub fn overrides(&self) -> &EnvOverrides {
        &self.overrides
    }

    /// Load metadata using the process environment for overrides.
    ///
    /// # Errors
    ///
    /// Returns `RuncfgError::MetadataFetch` if any fetch fails. No partial
    /// record is returned.
    pub async fn load(
        &self,
        cancel: &CancellationToken,
        fields: MetadataField,
    ) -> Result<Metadata, RuncfgError> {
        self.load_from_vars(&snapshot(), cancel, fields).await
    }

    /// Load metadata using `vars` for overrides.
    ///
    /// # Errors
    ///
    /// Returns `RuncfgError::MetadataFetch` if any fetch fails.
    pub async fn load_from_vars(
        &self,
        vars: &HashMap<String, String>,
        cancel: &CancellationToken,
        fields: MetadataField,
    ) -> Result<Metadata, RuncfgError> {
        self.resolve(vars, cancel, fields, &Metadata::default(), &Metadata::default())
            .await
    }

    /// Fill only the empty fields of `metadata`, using the process
    /// environment for overrides.
    ///
    /// # Errors
    ///
    /// Returns `RuncfgError::MetadataFetch` if any fetch fails; `metadata`
    /// is left unchanged in that case.
    pub async fn reload(
        &self,
        cancel: &CancellationToken,
        fields: MetadataField,
        metadata: &mut Metadata,
    ) -> Result<(), RuncfgError> {
        self.reload_from_vars(&snapshot(), cancel, fields, metadata)
            .await
    }

    /// Fill only the empty fields of `metadata`, using `vars` for overrides.
    ///
    /// # Errors
    ///
    /// Returns `RuncfgError::MetadataFetch` if any fetch fails; `metadata`
    /// is left unchanged in that case.
    pub async fn reload_from_vars(
        &self,
        vars: &HashMap<String, String>,
        cancel: &CancellationToken,
        fields: MetadataField,
        metadata: &mut Metadata,
    ) -> Result<(), RuncfgError> {
        let resolved = self
            .resolve(vars, cancel, fields, metadata, &Metadata::default())
            .await?;
        *metadata = resolved;
        Ok(())
    }

    /// Full resolution: prior → override → default → fetch.
    #[instrument(skip_all, fields(requested = ?fields))]
    pub(crate) async fn resolve(
        &self,
        vars: &HashMap<String, String>,
        cancel: &CancellationToken,
        fields: MetadataField,
        prior: &Metadata,
        defaults: &Metadata,
    ) -> Result<Metadata, RuncfgError> {
        let mut metadata = self.resolve_local(vars, prior, defaults);
        let plan = plan_fetches(fields, &metadata);

        if plan.is_empty() {
            debug!(target: "runcfg.metadata", "All metadata resolved without fetching");
            return Ok(metadata);
        }

        let fetched = self.fetch_all(cancel, &plan).await?;
        for (field, value) in fetched {
            metadata.set(field, value);
        }

        Ok(metadata)
    }

    fn resolve_local(
        &self,
        vars: &HashMap<String, String>,
        prior: &Metadata,
        defaults: &Metadata,
    ) -> Metadata {
        let mut metadata = prior.clone();

        for field in MetadataField::FIELDS {
            if metadata.get(field).is_some_and(|v| !v.is_empty()) {
                continue;
            }

            let value = first_var(vars, self.overrides.names(field));
            if !value.is_empty() {
                debug!(
                    target: "runcfg.metadata",
                    field = %field,
                    "Using environment override"
                );
                metadata.set(field, value);
                continue;
            }

            if let Some(default) = defaults.get(field).filter(|v| !v.is_empty()) {
                metadata.set(field, default);
            }
        }

        metadata
    }

    /// Run every planned fetch concurrently and wait for all of them.
    async fn fetch_all(
        &self,
        parent: &CancellationToken,
        plan: &[FetchTarget],
    ) -> Result<Fetched, RuncfgError> {
        if parent.is_cancelled() {
            let cancelled = plan
                .iter()
                .map(|&target| FieldFetchError {
                    target,
                    source: MetadataClientError::Cancelled,
                })
                .collect();
            return Err(MetadataFetchError::new(cancelled).into());
        }

        let cancel = parent.child_token();
        // Cancels in-flight fetches if this future is dropped mid-load.
        let _guard = cancel.clone().drop_guard();

        let handles: Vec<_> = plan
            .iter()
            .map(|&target| {
                let client = Arc::clone(&self.client);
                let token = cancel.clone();
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    // A fetch that is already complete wins over a concurrent
                    // cancellation; its result is discarded with the rest.
                    let result = tokio::select! {
                        biased;
                        res = fetch(client.as_ref(), target) => res,
                        () = token.cancelled() => Err(MetadataClientError::Cancelled),
                    };
                    metrics::record_metadata_fetch(
                        target.label(),
                        fetch_status(&result),
                        started.elapsed(),
                    );
                    if let Err(e) = &result {
                        if *e != MetadataClientError::Cancelled {
                            warn!(
                                target: "runcfg.metadata",
                                fetch = %target,
                                error = %e,
                                "Metadata fetch failed, cancelling siblings"
                            );
                        }
                        token.cancel();
                    }
                    result
                });
                (target, handle)
            })
            .collect();

        let mut fetched = Vec::new();
        let mut failures = Vec::new();
        let mut cancellations = Vec::new();

        for (target, handle) in handles {
            match handle.await {
                Ok(Ok(values)) => {
                    debug!(target: "runcfg.metadata", fetch = %target, "Metadata fetched");
                    fetched.extend(values);
                }
                Ok(Err(MetadataClientError::Cancelled)) => cancellations.push(FieldFetchError {
                    target,
                    source: MetadataClientError::Cancelled,
                }),
                Ok(Err(source)) => failures.push(FieldFetchError { target, source }),
                Err(e) => {
                    warn!(target: "runcfg.metadata", fetch = %target, error = %e, "Fetch task aborted");
                    cancel.cancel();
                    failures.push(FieldFetchError {
                        target,
                        source: MetadataClientError::Http(format!("fetch task failed: {e}")),
                    });
                }
            }
        }

        // Cancellations only matter when nothing else explains them, i.e.
        // the caller cancelled the load.
        if failures.is_empty() {
            failures = cancellations;
        }

        if failures.is_empty() {
            Ok(fetched)
        } else {
            Err(MetadataFetchError::new(failures).into())
        }
    }
}

fn fetch_status<T>(result: &Result<T, MetadataClientError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(MetadataClientError::Cancelled) => "cancelled",
        Err(_) => "error",
    }
}
