//! Axum router wiring (HTTP -> WS upgrade, ops, registry reads).

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/drivers/:driver_id", get(transport::ws::ws_upgrade))
        .route("/v1/drivers/locations", get(ops::locations::list_locations))
        .route("/v1/drivers/locations/:driver_id", get(ops::locations::get_location))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
