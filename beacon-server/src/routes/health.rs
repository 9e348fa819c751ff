use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde::Serialize;
use tracing::warn;

use crate::app_state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_streams: Option<usize>,
}

enum Readiness {
    Ready { active_streams: usize },
    Degraded,
    ShuttingDown,
}

impl Readiness {
    async fn probe(state: &AppState) -> Self {
        if state.registry.is_shutting_down() {
            return Self::ShuttingDown;
        }
        match state.store.ping().await {
            Ok(()) => Self::Ready {
                active_streams: state.registry.active_connections().await,
            },
            Err(err) => {
                warn!(error = %err, "readiness probe failed");
                Self::Degraded
            }
        }
    }

    fn into_parts(self) -> (StatusCode, HealthResponse) {
        match self {
            Self::Ready { active_streams } => (
                StatusCode::OK,
                HealthResponse {
                    status: "ready",
                    active_streams: Some(active_streams),
                },
            ),
            Self::Degraded => (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "degraded",
                    active_streams: None,
                },
            ),
            Self::ShuttingDown => (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "shutting_down",
                    active_streams: None,
                },
            ),
        }
    }
}

fn record_probe(endpoint: &'static str, status: StatusCode) {
    let outcome = if status.is_success() { "ok" } else { "error" };
    metrics::counter!("health_checks_total", "endpoint" => endpoint, "status" => outcome)
        .increment(1);
}

/// Liveness: the process is serving requests.
async fn healthz() -> impl IntoResponse {
    record_probe("healthz", StatusCode::OK);
    Json(HealthResponse {
        status: "ok",
        active_streams: None,
    })
}

/// Readiness: the store answers and the server is not draining.
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = Readiness::probe(&state).await.into_parts();
    record_probe("readyz", status);
    (status, Json(body))
}

pub fn create_health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
