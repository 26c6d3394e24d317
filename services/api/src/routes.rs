use std::sync::atomic::Ordering;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use fleetdesk::http::Responder;
use fleetdesk::workflows::access::access_router;
use fleetdesk::workflows::matching::matching_router;
use fleetdesk::workflows::verification::verification_router;
use serde_json::json;

use crate::infra::{AppState, Backoffice};

/// Mount every workflow router plus the operational endpoints.
pub(crate) fn with_backoffice_routes(backoffice: &Backoffice, responder: Responder) -> Router {
    Router::new()
        .merge(access_router(backoffice.access.clone(), responder))
        .merge(verification_router(
            backoffice.verification.clone(),
            responder,
        ))
        .merge(matching_router(backoffice.matching.clone(), responder))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Relaxed) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
