use super::ApiState;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Serialize)]
struct ReadinessResponse {
    status: &'static str,
    database: bool,
    details: Option<String>,
}

pub fn routes() -> Router<ApiState> {
    Router::new().route("/health", get(health_check)).route("/ready", get(readiness_check))
}

// Liveness check
async fn health_check(State(state): State<ApiState>) -> Response {
    if state.is_stopping() {
        info!("Health check returning unhealthy because service is shutting down");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "service": state.service_name })),
        )
            .into_response();
    }

    Json(json!({ "ok": true, "service": state.service_name })).into_response()
}

// Readiness check against the database
async fn readiness_check(State(state): State<ApiState>) -> Response {
    if state.is_stopping() {
        info!("Readiness check returning not ready because service is shutting down");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "shutting_down",
                database: false,
                details: Some("Service is shutting down".to_string()),
            }),
        )
            .into_response();
    }

    let (database, details) = match state.repo.check_connection().await {
        Ok(true) => (true, None),
        Ok(false) => {
            warn!("Database connection check returned false");
            (false, Some("Database connection check failed".to_string()))
        },
        Err(e) => {
            warn!("Database health check error: {:?}", e);
            (false, Some(format!("Database error: {}", e)))
        },
    };

    let (status, label) =
        if database { (StatusCode::OK, "healthy") } else { (StatusCode::SERVICE_UNAVAILABLE, "degraded") };

    (status, Json(ReadinessResponse { status: label, database, details })).into_response()
}
