//! Loader integration tests.
//!
//! Runs the service, job and metadata loaders against a mocked metadata
//! server over real HTTP.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use runcfg::metadata::FetchTarget;
use runcfg::{
    HttpMetadataClient, Job, LoadOptions, Metadata, MetadataClientError, MetadataField,
    MetadataLoader, RuncfgError, Service,
};
use runcfg_test_utils::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn loader_for(server: &MockMetadataServer) -> MetadataLoader {
    let client = HttpMetadataClient::with_base_url(server.base_url()).unwrap();
    MetadataLoader::with_client(Arc::new(client))
}

#[tokio::test]
async fn test_service_loads_identity_and_remote_metadata() {
    let server = MockMetadataServer::healthy().await;
    let loader = loader_for(&server);
    let vars = vars(&[("K_SERVICE", "checkout"), ("PORT", "3000")]);

    let service = Service::from_vars(&vars, &loader, &CancellationToken::new(), LoadOptions::new())
        .await
        .unwrap();

    assert_eq!(service.name, "checkout");
    assert_eq!(service.port, 3000);
    assert_eq!(
        service.metadata,
        Metadata {
            project_id: PROJECT_ID.to_string(),
            project_number: PROJECT_NUMBER.to_string(),
            region: REGION.to_string(),
            instance_id: INSTANCE_ID.to_string(),
            service_account_email: SERVICE_ACCOUNT_EMAIL.to_string(),
        }
    );

    // Region and project number come from one combined request.
    assert_eq!(server.received(paths::REGION).await, 1);
    assert_eq!(server.received(paths::NUMERIC_PROJECT_ID).await, 0);
    assert_eq!(server.received_total().await, 4);
}

#[tokio::test]
async fn test_service_container_fixture() {
    let server = MockMetadataServer::healthy().await;
    let loader = loader_for(&server);

    let service = Service::from_vars(
        &cloud_run_service_vars(),
        &loader,
        &CancellationToken::new(),
        LoadOptions::new().with_metadata(MetadataField::PROJECT_ID | MetadataField::REGION),
    )
    .await
    .unwrap();

    assert_eq!(service.revision, "checkout-00007-xyz");
    assert_eq!(service.metadata.project_id, PROJECT_ID);
    assert_eq!(service.metadata.region, REGION);
    assert_eq!(service.metadata.project_number, "");
    assert_eq!(server.received_total().await, 2);
}

#[tokio::test]
async fn test_port_zero_issues_no_request() {
    let server = MockMetadataServer::healthy().await;
    let loader = loader_for(&server);
    let vars = vars(&[("PORT", "0")]);

    let result =
        Service::from_vars(&vars, &loader, &CancellationToken::new(), LoadOptions::new()).await;

    assert!(matches!(result, Err(RuncfgError::InvalidPort(_))));
    assert_eq!(server.received_total().await, 0);
}

#[tokio::test]
async fn test_job_loads_task_identity() {
    let server = MockMetadataServer::healthy().await;
    let loader = loader_for(&server);

    let job = Job::from_vars(
        &cloud_run_job_vars(),
        &loader,
        &CancellationToken::new(),
        LoadOptions::new().with_metadata(MetadataField::INSTANCE_ID),
    )
    .await
    .unwrap();

    assert_eq!(job.name, "nightly-export");
    assert_eq!(job.task_index, 2);
    assert_eq!(job.task_count, 4);
    assert_eq!(job.metadata.instance_id, INSTANCE_ID);
    assert_eq!(server.received(paths::INSTANCE_ID).await, 1);
    assert_eq!(server.received_total().await, 1);
}

#[tokio::test]
async fn test_override_uses_numeric_project_endpoint() {
    let server = MockMetadataServer::healthy().await;
    let loader = loader_for(&server);
    let vars = vars(&[("GCP_REGION", "asia-northeast1")]);

    let metadata = loader
        .load_from_vars(
            &vars,
            &CancellationToken::new(),
            MetadataField::REGION | MetadataField::PROJECT_NUMBER,
        )
        .await
        .unwrap();

    assert_eq!(metadata.region, "asia-northeast1");
    assert_eq!(metadata.project_number, PROJECT_NUMBER);
    assert_eq!(server.received(paths::REGION).await, 0);
    assert_eq!(server.received(paths::NUMERIC_PROJECT_ID).await, 1);
}

#[tokio::test]
async fn test_failed_endpoint_is_reported() {
    let server = MockMetadataServer::healthy_except(&[paths::INSTANCE_ID]).await;
    server.mount_status(paths::INSTANCE_ID, 503).await;
    let loader = loader_for(&server);

    let err = loader
        .load_from_vars(&HashMap::new(), &CancellationToken::new(), MetadataField::ALL)
        .await
        .unwrap_err();

    let RuncfgError::MetadataFetch(fetch) = err else {
        panic!("expected MetadataFetch, got {err:?}");
    };
    let failure = fetch
        .errors()
        .iter()
        .find(|e| e.target == FetchTarget::InstanceId)
        .expect("instance ID failure");
    assert_eq!(
        failure.source,
        MetadataClientError::Status {
            path: paths::INSTANCE_ID.to_string(),
            status: 503,
        }
    );
}

#[tokio::test]
async fn test_undefined_endpoint_is_not_defined() {
    let server = MockMetadataServer::healthy_except(&[paths::SERVICE_ACCOUNT_EMAIL]).await;
    let loader = loader_for(&server);

    let err = loader
        .load_from_vars(
            &HashMap::new(),
            &CancellationToken::new(),
            MetadataField::SERVICE_ACCOUNT_EMAIL,
        )
        .await
        .unwrap_err();

    let RuncfgError::MetadataFetch(fetch) = err else {
        panic!("expected MetadataFetch, got {err:?}");
    };
    assert!(matches!(
        fetch.errors().first().map(|e| &e.source),
        Some(MetadataClientError::NotDefined(_))
    ));
}

#[tokio::test]
async fn test_failure_does_not_wait_for_slow_sibling() {
    let server = MockMetadataServer::healthy_except(&[
        paths::INSTANCE_ID,
        paths::SERVICE_ACCOUNT_EMAIL,
    ])
    .await;
    server.mount_status(paths::INSTANCE_ID, 500).await;
    server
        .mount_delayed(
            paths::SERVICE_ACCOUNT_EMAIL,
            SERVICE_ACCOUNT_EMAIL,
            Duration::from_secs(5),
        )
        .await;
    let loader = loader_for(&server);

    let started = Instant::now();
    let result = loader
        .load_from_vars(&HashMap::new(), &CancellationToken::new(), MetadataField::ALL)
        .await;

    assert!(result.is_err());
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "slow sibling should be cancelled, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_caller_cancellation_stops_load() {
    let server = MockMetadataServer::healthy_except(&[paths::PROJECT_ID]).await;
    server
        .mount_delayed(paths::PROJECT_ID, PROJECT_ID, Duration::from_secs(5))
        .await;
    let loader = loader_for(&server);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = loader
        .load_from_vars(&HashMap::new(), &cancel, MetadataField::PROJECT_ID)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(4));
    let RuncfgError::MetadataFetch(fetch) = err else {
        panic!("expected MetadataFetch, got {err:?}");
    };
    assert!(fetch
        .errors()
        .iter()
        .all(|e| e.source == MetadataClientError::Cancelled));
}

#[tokio::test]
async fn test_reload_fills_only_empty_fields() {
    let server = MockMetadataServer::healthy().await;
    let loader = loader_for(&server);
    let mut metadata = Metadata {
        project_id: "already-known".to_string(),
        ..Metadata::default()
    };

    loader
        .reload_from_vars(
            &HashMap::new(),
            &CancellationToken::new(),
            MetadataField::PROJECT_ID | MetadataField::INSTANCE_ID,
            &mut metadata,
        )
        .await
        .unwrap();

    assert_eq!(metadata.project_id, "already-known");
    assert_eq!(metadata.instance_id, INSTANCE_ID);
    assert_eq!(server.received(paths::PROJECT_ID).await, 0);
}
