use super::{ApiError, ApiState, error::error_envelope, parse_body};
use crate::state_assigner::{
    HumanVerifyAction, HumanVerifyError, HumanVerifyRequest, ListRequest, human_verify,
    list_state_assignments,
};
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
};
use serde_json::json;
use tracing::error;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/", post(list_assignments))
        .route("/human-verify/:article_id", post(verify))
}

async fn list_assignments(State(state): State<ApiState>, body: Bytes) -> Result<Response, ApiError> {
    let request = match parse_body(&body).and_then(|v| ListRequest::from_json(&v)) {
        Ok(request) => request,
        Err(message) => {
            return Ok((StatusCode::BAD_REQUEST, Json(json!({ "result": false, "message": message })))
                .into_response());
        },
    };

    let articles = list_state_assignments(state.repo.as_ref(), request).await?;
    Ok(Json(json!({
        "result": true,
        "message": "Successfully retrieved articles with state assignments",
        "count": articles.len(),
        "articles": articles,
    }))
    .into_response())
}

async fn verify(State(state): State<ApiState>, Path(article_id): Path<String>, body: Bytes) -> Response {
    let Ok(article_id) = article_id.parse::<i64>() else {
        return error_envelope(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Invalid article ID provided",
            Some("Article ID must be a valid number".to_string()),
        );
    };

    let request = match parse_body(&body).and_then(|v| HumanVerifyRequest::from_json(&v)) {
        Ok(request) => request,
        Err(message) => {
            return error_envelope(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", &message, None);
        },
    };

    match human_verify(state.repo.as_ref(), article_id, request).await {
        Ok(details) => {
            let status = match request.action {
                HumanVerifyAction::Approve => "Article state approved successfully",
                HumanVerifyAction::Reject => "Article state rejected successfully",
            };
            Json(json!({
                "status": status,
                "stateHumanApprovedArray": details.state_human_approved_array,
                "stateAiApproved": details.state_ai_approved,
            }))
            .into_response()
        },
        Err(e @ HumanVerifyError::AssignmentNotFound { .. }) => error_envelope(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "AI state assignment not found",
            Some(e.to_string()),
        ),
        Err(e @ HumanVerifyError::ArticleNotFound(_)) => {
            error_envelope(StatusCode::NOT_FOUND, "NOT_FOUND", "Article not found", Some(e.to_string()))
        },
        Err(e @ HumanVerifyError::AlreadyApproved { .. }) => error_envelope(
            StatusCode::CONFLICT,
            "CONFLICT",
            "State already approved",
            Some(e.to_string()),
        ),
        Err(HumanVerifyError::Repository(e)) => {
            error!("Human verification failed for article {}: {}", article_id, e);
            error_envelope(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Failed to process human verification",
                None,
            )
        },
    }
}
