use super::{ApiError, ApiState, error::error_envelope, parse_body};
use crate::{
    articles::{ArticleListRequest, list_approved_articles, list_review_articles, summarize},
    state_assigner::format_article_details,
};
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use chrono::Utc;
use serde_json::json;
use std::time::Instant;
use tracing::{error, info};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/", post(list_articles))
        .route("/approved", get(approved))
        .route("/summary-statistics", get(summary_statistics))
        .route("/article-details/:article_id", get(article_details))
        .route("/:article_id", delete(delete_article))
}

async fn list_articles(State(state): State<ApiState>, body: Bytes) -> Result<Response, ApiError> {
    let request = match parse_body(&body).and_then(|v| ArticleListRequest::from_json(&v)) {
        Ok(request) => request,
        Err(message) => {
            return Ok((StatusCode::BAD_REQUEST, Json(json!({ "result": false, "message": message })))
                .into_response());
        },
    };

    let articles = list_review_articles(state.repo.as_ref(), request).await?;
    Ok(Json(json!({ "articlesArray": articles })).into_response())
}

async fn approved(State(state): State<ApiState>) -> Result<Json<serde_json::Value>, ApiError> {
    let started = Instant::now();
    let articles = list_approved_articles(state.repo.as_ref()).await?;
    Ok(Json(json!({
        "articlesArray": articles,
        "timeToRenderResponseFromApiInSeconds": started.elapsed().as_secs_f64(),
    })))
}

async fn summary_statistics(
    State(state): State<ApiState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let statistics = summarize(state.repo.as_ref(), Utc::now()).await?;
    Ok(Json(json!({ "summaryStatistics": statistics })))
}

async fn article_details(State(state): State<ApiState>, Path(article_id): Path<String>) -> Response {
    let Ok(article_id) = article_id.parse::<i64>() else {
        return error_envelope(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Invalid article ID provided",
            Some("Article ID must be a valid number".to_string()),
        );
    };

    let rows = match state.repo.article_detail_rows(article_id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("Loading details of article {} failed: {}", article_id, e);
            return error_envelope(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Failed to retrieve article details",
                None,
            );
        },
    };

    match format_article_details(&rows) {
        Some(details) => Json(details).into_response(),
        None => error_envelope(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Article not found",
            Some(format!("No article exists with ID {}", article_id)),
        ),
    }
}

async fn delete_article(
    State(state): State<ApiState>,
    Path(article_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let article_id = article_id
        .parse::<i64>()
        .map_err(|_| ApiError::Validation("articleId must be a number".to_string()))?;

    if !state.repo.delete_article(article_id).await? {
        return Err(ApiError::NotFound(format!("Article {} not found", article_id)));
    }
    info!("Deleted article {}", article_id);
    Ok(Json(json!({ "result": true, "status": format!("articleId {} deleted", article_id) })))
}
