//! Health endpoints.
//!
//! `/healthz` answers 200 for as long as the process can serve HTTP at all.
//! `/readyz` follows the server [`Lifecycle`]: 200 only while serving, 503
//! with the phase name while starting or draining.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Phase of the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Configuration and metadata are still loading.
    Starting = 0,
    /// Listener bound and accepting traffic.
    Serving = 1,
    /// Shutdown signal received; in-flight requests are finishing.
    Draining = 2,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Serving,
            2 => Self::Draining,
            _ => Self::Starting,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Serving => "serving",
            Self::Draining => "draining",
        }
    }
}

/// Shared lifecycle of the server, advanced by `main`.
///
/// Transitions only move forward: a draining server never serves again.
#[derive(Debug, Default)]
pub struct Lifecycle {
    phase: AtomicU8,
}

impl Lifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Starting → Serving. Returns false if the server is already draining.
    pub fn start_serving(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Starting as u8,
                Phase::Serving as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Any phase → Draining.
    pub fn start_draining(&self) {
        self.phase.store(Phase::Draining as u8, Ordering::Release);
    }
}

/// Router with `/healthz` and `/readyz`.
pub fn health_router(lifecycle: Arc<Lifecycle>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { StatusCode::OK }))
        .route("/readyz", get(readiness))
        .with_state(lifecycle)
}

async fn readiness(State(lifecycle): State<Arc<Lifecycle>>) -> (StatusCode, &'static str) {
    let phase = lifecycle.phase();
    let status = if phase == Phase::Serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, phase.as_str())
}
