//! Read-only view of the location registry for dispatch/routing consumers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use drivertrack_core::error::DriverTrackError;

use crate::app_state::AppState;
use crate::ops::ApiError;
use crate::registry::LocationRecord;

#[derive(Debug, Serialize, PartialEq)]
pub struct DriverLocation {
    pub driver_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub updated_at_ms: u64,
}

impl DriverLocation {
    fn new(driver_id: String, r: LocationRecord) -> Self {
        Self {
            driver_id,
            latitude: r.latitude,
            longitude: r.longitude,
            updated_at_ms: r.updated_at_ms,
        }
    }
}

pub async fn list_locations(State(state): State<AppState>) -> Json<Vec<DriverLocation>> {
    let all = state
        .registry()
        .get_all()
        .into_iter()
        .map(|(id, r)| DriverLocation::new(id, r))
        .collect();
    Json(all)
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> Result<Json<DriverLocation>, ApiError> {
    let record = state
        .registry()
        .get(&driver_id)
        .ok_or_else(|| DriverTrackError::NotFound(format!("no live location for driver {driver_id}")))?;
    Ok(Json(DriverLocation::new(driver_id, record)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use jsonwebtoken::Algorithm;

    use super::*;
    use crate::config::{GatewayConfig, SigningSettings};

    fn state() -> AppState {
        let signing = SigningSettings::new("ops-secret", Algorithm::HS256).unwrap();
        AppState::new(GatewayConfig::default(), &signing).unwrap()
    }

    #[tokio::test]
    async fn lists_live_drivers_sorted() {
        let app = state();
        app.registry().update_location("d2", Some(2.0), Some(3.0));
        app.registry().update_location("d1", Some(12.9), Some(77.6));

        let Json(all) = list_locations(State(app)).await;
        let ids: Vec<&str> = all.iter().map(|d| d.driver_id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert_eq!(all[0].latitude, Some(12.9));
        assert_eq!(all[0].longitude, Some(77.6));
    }

    #[tokio::test]
    async fn single_lookup_and_not_found() {
        let app = state();
        app.registry().update_location("d1", Some(1.5), None);

        let Json(one) = get_location(State(app.clone()), Path("d1".to_string())).await.unwrap();
        assert_eq!(one.latitude, Some(1.5));
        assert_eq!(one.longitude, None);

        let err = get_location(State(app), Path("nobody".to_string())).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
