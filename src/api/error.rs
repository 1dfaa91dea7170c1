use crate::{
    database::RepositoryError, deduper::DeduperError, feed::FeedError, news_api::NewsApiError,
};
use axum::{
    async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure of an API handler, answered as `{ success: false, error, message }`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Google News RSS rate limit exceeded")]
    RateLimited,

    #[error("Failed to fetch RSS feed: {0}")]
    Feed(#[from] FeedError),

    #[error("Database operation failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Deduper(#[from] DeduperError),

    #[error(transparent)]
    NewsApi(#[from] NewsApiError),

    #[error(transparent)]
    Json(#[from] JsonRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidRequest(_) | ApiError::Json(_) => {
                StatusCode::BAD_REQUEST
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Deduper(_) => StatusCode::BAD_GATEWAY,
            ApiError::NewsApi(NewsApiError::MissingApiKey | NewsApiError::InvalidBaseUrl { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
            ApiError::NewsApi(_) => StatusCode::BAD_GATEWAY,
            ApiError::Feed(_) | ApiError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::Json(_) => "Invalid parameters",
            ApiError::InvalidRequest(_) => "Invalid request",
            ApiError::NotFound(_) => "Not found",
            ApiError::RateLimited => "Rate limit exceeded",
            ApiError::Deduper(_) => "Deduper unavailable",
            ApiError::NewsApi(_) => "News API unavailable",
            ApiError::Feed(_) => "Internal server error",
            ApiError::Repository(_) => "Database error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = match self {
            ApiError::RateLimited => json!({
                "success": false,
                "error": self.label(),
                "message": "Google News returned HTTP 503. Please wait before retrying.",
                "statusCode": status.as_u16(),
            }),
            _ => json!({
                "success": false,
                "error": self.label(),
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejection is answered with an `ApiError` body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `{ error: { code, message, details, status } }` body used by the article
/// detail endpoints
pub fn error_envelope(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<String>,
) -> Response {
    (
        status,
        Json(json!({
            "error": {
                "code": code,
                "message": message,
                "details": details,
                "status": status.as_u16(),
            }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_api_failures_map_to_status() {
        assert_eq!(
            ApiError::from(NewsApiError::MissingApiKey).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let bad_body = NewsApiError::InvalidBody { status: 200, message: "expected value".to_string() };
        assert_eq!(ApiError::from(bad_body).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_envelope_carries_status() {
        let response = error_envelope(StatusCode::NOT_FOUND, "NOT_FOUND", "Article not found", None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
