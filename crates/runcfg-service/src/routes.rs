//! HTTP routes.
//!
//! - `GET /` - greeting
//! - `GET /healthz`, `GET /readyz` - health (see `health`)
//! - `GET /metrics` - Prometheus text format
//!
//! Every request runs inside a `request` span carrying the trace context
//! from `traceparent` or `X-Cloud-Trace-Context`, so its logs correlate
//! with the trace in Cloud Logging.

use crate::config::REQUEST_TIMEOUT;
use crate::health::{health_router, Lifecycle};
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use runcfg::observability::TraceContext;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::field::Empty;
use tracing::{debug, info_span, Instrument};

/// Shared state for the application routes.
pub struct AppState {
    pub greeting: String,
    pub service_name: String,
    pub metrics: PrometheusHandle,
}

/// Build the full router.
pub fn build_routes(state: Arc<AppState>, lifecycle: Arc<Lifecycle>) -> Router {
    Router::new()
        .route("/", get(greeting_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .merge(health_router(lifecycle))
        .layer(middleware::from_fn(trace_span))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::new())
}

async fn greeting_handler(State(state): State<Arc<AppState>>) -> String {
    if state.service_name.is_empty() {
        format!("{}!", state.greeting)
    } else {
        format!("{} from {}!", state.greeting, state.service_name)
    }
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

/// Runs the request inside a span carrying the incoming trace context.
async fn trace_span(request: Request, next: Next) -> Response {
    let trace = TraceContext::from_headers(|name| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    });

    let span = info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        trace_id = Empty,
        span_id = Empty,
        trace_sampled = Empty,
    );
    if let Some(trace) = &trace {
        span.record("trace_id", trace.trace_id.as_str());
        span.record("span_id", trace.span_id.as_str());
        span.record("trace_sampled", trace.sampled);
    }

    async move {
        let response = next.run(request).await;
        debug!(target: "runcfg_service.http", status = response.status().as_u16(), "Request complete");
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::util::ServiceExt;

    fn app(service_name: &str) -> Router {
        let state = Arc::new(AppState {
            greeting: "Hello".to_string(),
            service_name: service_name.to_string(),
            metrics: PrometheusBuilder::new().build_recorder().handle(),
        });
        build_routes(state, Arc::new(Lifecycle::new()))
    }

    async fn get_body(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_greeting_with_service_name() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let (status, body) = get_body(app("checkout"), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello from checkout!");
    }

    #[tokio::test]
    async fn test_greeting_without_service_name() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let (_, body) = get_body(app(""), request).await;

        assert_eq!(body, "Hello!");
    }

    #[tokio::test]
    async fn test_trace_header_is_accepted() {
        let request = Request::builder()
            .uri("/")
            .header("x-cloud-trace-context", "105445aa7843bc8bf206b12000100000/1;o=1")
            .body(Body::empty())
            .unwrap();

        let (status, _) = get_body(app("checkout"), request).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let (status, _) = get_body(app("checkout"), request).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_endpoints_are_routed() {
        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();

        let (status, _) = get_body(app("checkout"), request).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();

        let (status, _) = get_body(app("checkout"), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
