//! # runcfg Test Utilities
//!
//! Shared test utilities for the `runcfg` crates.
//!
//! This crate provides:
//! - Mock metadata server (`MockMetadataServer`, backed by wiremock)
//! - Environment fixtures (`cloud_run_service_vars`, `cloud_run_job_vars`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use runcfg_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let server = MockMetadataServer::healthy().await;
//!     let client = HttpMetadataClient::with_base_url(server.base_url()).unwrap();
//!
//!     assert_eq!(client.project_id().await.unwrap(), PROJECT_ID);
//!     assert_eq!(server.received(paths::PROJECT_ID).await, 1);
//! }
//! ```

pub mod fixtures;
pub mod metadata_server;

// Re-export commonly used items
pub use fixtures::*;
pub use metadata_server::*;
