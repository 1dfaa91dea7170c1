use super::{ApiError, ApiState};
use crate::deduper::UpstreamResponse;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use serde_json::json;
use tracing::info;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/request-job/:report_id", get(request_job))
        .route("/job-list-status", get(job_list_status))
        .route("/job-status/:job_id", get(job_status))
        .route("/cancel-job/:job_id", post(cancel_job))
        .route("/clear-article-duplicate-analyses-table", delete(clear_table))
}

fn relay(upstream: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(upstream.body)).into_response()
}

async fn request_job(
    State(state): State<ApiState>,
    Path(report_id): Path<i64>,
) -> Result<Response, ApiError> {
    let article_ids = state.repo.article_ids_for_report(report_id).await?;
    if article_ids.is_empty() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "result": false,
                "message": format!("No articles found for report {}", report_id),
            })),
        )
            .into_response());
    }

    info!("Requesting deduper job for report {} ({} articles)", report_id, article_ids.len());
    Ok(relay(state.deduper.request_job(report_id).await?))
}

async fn job_list_status(State(state): State<ApiState>) -> Result<Response, ApiError> {
    Ok(relay(state.deduper.list_jobs().await?))
}

async fn job_status(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(relay(state.deduper.job_status(&job_id).await?))
}

async fn cancel_job(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    info!("Cancelling deduper job {}", job_id);
    Ok(relay(state.deduper.cancel_job(&job_id).await?))
}

async fn clear_table(State(state): State<ApiState>) -> Result<Response, ApiError> {
    info!("Clearing article duplicate analyses table");
    Ok(relay(state.deduper.clear_table().await?))
}
