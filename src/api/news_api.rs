use super::{ApiError, ApiState, parse_body};
use crate::{
    database::models::NEWS_API_ORG_NAME,
    ingest::{self, store_news_api_response},
    news_api::NewsApiQuery,
    reports::parse_submitted_date,
};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tracing::info;

const REQUIRED_FIELDS: [&str; 3] = ["startDate", "endDate", "keywordString"];

pub fn routes() -> Router<ApiState> {
    Router::new().route("/request", post(request))
}

fn rejected(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "result": false, "message": message.into() }))).into_response()
}

fn text<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn date(body: &Value, key: &str) -> Result<NaiveDate, String> {
    text(body, key)
        .and_then(parse_submitted_date)
        .ok_or_else(|| format!("{} must be a date (YYYY-MM-DD)", key))
}

/// Validated body of a News API search request
fn parse_request(body: &Value) -> Result<(String, NaiveDate, NaiveDate), String> {
    if REQUIRED_FIELDS.iter().any(|key| text(body, key).is_none()) {
        return Err("Missing startDate, endDate, keywordString".to_string());
    }
    let start = date(body, "startDate")?;
    let end = date(body, "endDate")?;
    if start > end {
        return Err("startDate must not be after endDate".to_string());
    }
    let keyword = text(body, "keywordString").unwrap_or_default().to_string();
    Ok((keyword, start, end))
}

async fn request(State(state): State<ApiState>, body: Bytes) -> Result<Response, ApiError> {
    let (keyword, start, end) = match parse_body(&body).and_then(|v| parse_request(&v)) {
        Ok(parsed) => parsed,
        Err(message) => return Ok(rejected(StatusCode::BAD_REQUEST, message)),
    };

    let Some(client) = state.news_api.as_ref() else {
        return Ok(rejected(StatusCode::INTERNAL_SERVER_ERROR, "News API is not configured."));
    };

    let source = ingest::ensure_news_api_source(state.repo.as_ref()).await?;
    let query = NewsApiQuery::new(keyword, Some(start), Some(end), ingest::today());
    info!("Requesting News API articles for {:?} ({} to {})", query.keyword, start, end);

    let response = client.everything(&query).await?;
    let (request_id, outcome) =
        store_news_api_response(state.repo.as_ref(), source, &query, &response).await?;

    let Some(outcome) = outcome else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": response.payload.status.as_deref().unwrap_or("error"),
                "result": false,
                "message": response.error_message(),
            })),
        )
            .into_response());
    };

    Ok(Json(json!({
        "result": true,
        "message": "Request sent successfully",
        "newsApiSourceObj": {
            "id": source.aggregator_source_id,
            "nameOfOrg": NEWS_API_ORG_NAME,
            "isRss": false,
            "isApi": true,
        },
        "newsApiRequestId": request_id,
        "articlesReceived": outcome.articles_received,
        "articlesSaved": outcome.articles_saved,
    }))
    .into_response())
}
