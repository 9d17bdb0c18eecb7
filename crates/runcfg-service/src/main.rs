//! runcfg service
//!
//! Minimal Cloud Run service wired from the `runcfg` bootstrap: Cloud
//! Logging output, service configuration and metadata, Prometheus metrics,
//! health endpoints and graceful shutdown on SIGTERM.

mod config;
mod health;
mod routes;

use config::Config;
use health::Lifecycle;
use routes::AppState;
use runcfg::observability::metrics::init_metrics_recorder;
use runcfg::observability::{init_logging, CloudLoggingFormat, Resource};
use runcfg::{LoadOptions, MetadataLoader, Service};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The project ID is only known once metadata is loaded; clones of the
    // formatter pick it up then.
    let log_format = CloudLoggingFormat::deferred();
    init_logging(
        log_format.clone(),
        "runcfg=info,runcfg_service=info,tower_http=info",
    )?;

    info!("Starting runcfg service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // A signal during startup cancels the metadata load.
    let lifecycle = Arc::new(Lifecycle::new());
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone(), Arc::clone(&lifecycle)));

    // Load service configuration, bounded by the startup timeout
    let loader = MetadataLoader::new().map_err(|e| {
        error!("Failed to build metadata loader: {}", e);
        e
    })?;
    let service = tokio::time::timeout(
        config.startup_timeout,
        Service::from_env(&loader, &shutdown, LoadOptions::new()),
    )
    .await
    .map_err(|e| {
        error!(
            timeout_seconds = config.startup_timeout.as_secs(),
            "Timed out loading service configuration"
        );
        e
    })?
    .map_err(|e| {
        error!("Failed to load service configuration: {}", e);
        e
    })?;

    log_format.set_project_id(&service.metadata.project_id);

    info!(
        service = %service.name,
        revision = %service.revision,
        region = %service.metadata.region,
        port = service.port,
        "Configuration loaded successfully"
    );

    // Metrics carry the telemetry resource as global labels
    let resource = Resource::for_service(&service)
        .with_attribute("gcp.project_id", &service.metadata.project_id);
    let metrics = init_metrics_recorder(&resource).map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        greeting: config.greeting.clone(),
        service_name: service.name.clone(),
        metrics,
    });
    let app = routes::build_routes(state, Arc::clone(&lifecycle));

    let addr = SocketAddr::from(([0, 0, 0, 0], service.port));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind {}: {}", addr, e);
        e
    })?;

    if !lifecycle.start_serving() {
        warn!("Shutdown requested during startup, not serving");
        return Err(ShutdownError::DuringStartup.into());
    }
    info!("runcfg service listening on {}", addr);

    let graceful = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { graceful.cancelled().await })
            .await
    });

    // Either the server stops on its own (an error) or a signal arrives.
    tokio::select! {
        result = &mut server => {
            shutdown.cancel();
            result??;
            return Ok(());
        }
        () = shutdown.cancelled() => {}
    }

    drain(server, config.shutdown_timeout).await?;
    info!("runcfg service shutdown complete");

    Ok(())
}

/// Waits up to `timeout` for the server task to finish draining, aborting
/// it otherwise.
async fn drain<E>(
    mut server: JoinHandle<Result<(), E>>,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>>
where
    E: std::error::Error + 'static,
{
    match tokio::time::timeout(timeout, &mut server).await {
        Ok(result) => result?.map_err(|e| {
            error!("Server shutdown failed: {}", e);
            Box::new(e) as Box<dyn std::error::Error>
        }),
        Err(_) => {
            warn!(
                timeout_seconds = timeout.as_secs(),
                "Graceful shutdown timed out, aborting in-flight requests"
            );
            server.abort();
            Err(ShutdownError::DrainTimeout(timeout).into())
        }
    }
}

/// Shutdown outcomes that end the process with a failure.
#[derive(Debug, thiserror::Error)]
enum ShutdownError {
    #[error("shutdown requested before the server started")]
    DuringStartup,

    #[error("in-flight requests did not finish within {0:?}")]
    DrainTimeout(Duration),
}

/// Waits for SIGINT or SIGTERM, moves the server to draining and cancels
/// `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken, lifecycle: Arc<Lifecycle>) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => {
                error!("Failed to listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
        () = shutdown.cancelled() => return,
    }

    lifecycle.start_draining();
    shutdown.cancel();
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_drain_completes_within_timeout() {
        let server = tokio::spawn(async { Ok::<(), io::Error>(()) });

        assert!(drain(server, Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_drain_timeout_is_an_error() {
        let server = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok::<(), io::Error>(())
        });

        let err = drain(server, Duration::from_millis(20)).await.unwrap_err();

        assert!(err.downcast_ref::<ShutdownError>().is_some());
        assert!(err.to_string().contains("did not finish"));
    }

    #[tokio::test]
    async fn test_drain_propagates_server_error() {
        let server = tokio::spawn(async { Err::<(), _>(io::Error::other("accept failed")) });

        let err = drain(server, Duration::from_secs(1)).await.unwrap_err();

        assert_eq!(err.to_string(), "accept failed");
    }
}
