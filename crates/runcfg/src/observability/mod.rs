//! Observability helpers for Cloud Run.
//!
//! - `logging` - Cloud Logging JSON formatter and trace correlation
//! - `metrics` - metadata fetch metrics and Prometheus recorder setup
//! - `resource` - telemetry resource attributes for a service or job

pub mod logging;
pub mod metrics;
pub mod resource;

pub use logging::{init_logging, CloudLoggingFormat, TraceContext, TraceContextLayer};
pub use resource::Resource;
