use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::infrastructure::database;
use crate::presentation::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct HealthDto {
    pub(crate) status: String,
}

impl HealthDto {
    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses((status = 200, description = "Process is up", body = HealthDto))
)]
pub(crate) async fn health() -> Json<HealthDto> {
    Json(HealthDto::with_status("ok"))
}

#[utoipa::path(
    get,
    path = "/healthz/db",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = HealthDto),
        (status = 503, description = "Database unreachable", body = HealthDto)
    )
)]
pub(crate) async fn database_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthDto>) {
    match database::ping(&state.pool).await {
        Ok(()) => (StatusCode::OK, Json(HealthDto::with_status("ok"))),
        Err(err) => {
            warn!(error = %err, "database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthDto::with_status("unavailable")),
            )
        }
    }
}
