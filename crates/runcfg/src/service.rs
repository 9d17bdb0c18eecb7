//! Cloud Run service configuration.
//!
//! Reads the service container contract:
//! - `PORT` - listen port, 1-65535
//! - `K_SERVICE`, `K_REVISION`, `K_CONFIGURATION` - service identity
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

/// Configuration of a running Cloud Run service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Platform metadata for the instance.
    pub metadata: Metadata,

    /// Port the HTTP server should listen on. Never 0.
    pub port: u16,

    /// Name of the service (`K_SERVICE`).
    pub name: String,

    /// Name of the revision being run (`K_REVISION`).
    pub revision: String,

    /// Name of the configuration that created the revision
    /// (`K_CONFIGURATION`).
    pub configuration: String,
}

impl Service {
    /// Load the service configuration from the process environment.
    ///
    /// # Errors
    ///
    /// - `EnvironmentProcess` if `PORT` is not a valid port number
    /// - `InvalidPort` if the port resolves to 0
    /// - `MetadataFetch` if any metadata fetch fails
    pub async fn from_env(
        loader: &MetadataLoader,
        cancel: &CancellationToken,
        opts: LoadOptions,
    ) -> Result<Self, RuncfgError> {
        Self::from_vars(&snapshot(), loader, cancel, opts).await
    }

    /// Load the service configuration from `vars`.
    ///
    /// # Errors
    ///
    /// Same as [`Service::from_env`].
    #[instrument(skip_all)]
    pub async fn from_vars(
        vars: &HashMap<String, String>,
        loader: &MetadataLoader,
        cancel: &CancellationToken,
        opts: LoadOptions,
    ) -> Result<Self, RuncfgError> {
        let port = match parse_var::<u16>(vars, "PORT")? {
            Some(0) => {
                return Err(RuncfgError::InvalidPort(
                    "PORT environment variable cannot be 0".to_string(),
                ))
            }
            Some(port) => port,
            None if opts.port == 0 => {
                return Err(RuncfgError::InvalidPort(
                    "default port cannot be 0".to_string(),
                ))
            }
            None => opts.port,
        };

        let name = var_or(vars, "K_SERVICE", &opts.service_name);
        let revision = var_or(vars, "K_REVISION", &opts.service_revision);
        let configuration = var_or(vars, "K_CONFIGURATION", &opts.service_configuration);

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
            target: "runcfg.service",
            service = %name,
            revision = %revision,
            port,
            "Service configuration loaded"
        );

        Ok(Self {
            metadata,
            port,
            name,
            revision,
            configuration,
        })
    }
}
