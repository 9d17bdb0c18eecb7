//! Configuration and observability bootstrap for Cloud Run containers.
//!
//! Loads typed configuration from the container contract environment
//! variables and the instance metadata server, and provides the logging,
//! metrics and telemetry-resource helpers a service or job needs at startup.
//!
//! # Modules
//!
//! - `env` - first-non-empty environment variable resolution
//! - `error` - error taxonomy shared by every loader
//! - `metadata` - concurrent metadata loader, field set and metadata client
//! - `options` - load options applied before a service or job is loaded
//! - `service` - Cloud Run service configuration (`PORT`, `K_*`)
//! - `job` - Cloud Run job configuration (`CLOUD_RUN_*`)
//! - `observability` - Cloud Logging formatter, metrics, telemetry resource
//!
//! # Example
//!
//! ```rust,ignore
//! use runcfg::{LoadOptions, MetadataField, MetadataLoader, Service};
//! use tokio_util::sync::CancellationToken;
//!
//! let loader = MetadataLoader::new()?;
//! let cancel = CancellationToken::new();
//! let opts = LoadOptions::new()
//!     .with_default_port(&[3000])
//!     .with_metadata(MetadataField::PROJECT_ID | MetadataField::REGION);
//!
//! let service = Service::from_env(&loader, &cancel, opts).await?;
//! println!("listening on {} in {}", service.port, service.metadata.region);
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Module for environment variable resolution
pub mod env;

/// Module for the error taxonomy
pub mod error;

/// Module for the metadata loader and client
pub mod metadata;

/// Module for load options
pub mod options;

/// Module for Cloud Run service configuration
pub mod service;

/// Module for Cloud Run job configuration
pub mod job;

/// Module for logging, metrics and telemetry resources
pub mod observability;

pub use error::{MetadataFetchError, RuncfgError};
pub use job::Job;
pub use metadata::{
    EnvOverrides, HttpMetadataClient, Metadata, MetadataClient, MetadataClientError,
    MetadataField, MetadataLoader,
};
pub use options::LoadOptions;
pub use service::Service;
