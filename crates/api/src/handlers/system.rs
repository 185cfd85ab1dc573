use axum::{extract::State, http::StatusCode, Json};
use service::ServiceHealth;

use super::AppState;

/// The bare root is not browsable.
pub async fn root() -> StatusCode {
    StatusCode::FORBIDDEN
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Vec<ServiceHealth>>) {
    let report = state.services.health.check().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report.services))
}
