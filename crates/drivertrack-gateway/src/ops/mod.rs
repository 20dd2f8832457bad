//! Operational and read-only HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 when draining)
//! - `/metrics` : Prometheus text format
//! - `/v1/drivers/locations[/{driver_id}]` : registry reads (see `locations`)

pub mod locations;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use drivertrack_core::error::{ClientCode, DriverTrackError};

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let extra = state.metrics_extra();
    let body = state.metrics().render(&extra);

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

/// HTTP wrapper for `DriverTrackError` (JSON body, status by code).
#[derive(Debug)]
pub struct ApiError(pub DriverTrackError);

impl From<DriverTrackError> for ApiError {
    fn from(e: DriverTrackError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status = match code {
            ClientCode::NotFound => StatusCode::NOT_FOUND,
            ClientCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ClientCode::Forbidden => StatusCode::FORBIDDEN,
            ClientCode::BadRequest | ClientCode::MalformedPayload => StatusCode::BAD_REQUEST,
            ClientCode::Transport | ClientCode::Config | ClientCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({
            "error": code.as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
