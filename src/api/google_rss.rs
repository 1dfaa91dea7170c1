use super::{ApiError, ApiJson, ApiState};
use crate::{
    database::models::RequestStatus,
    feed::RssItem,
    ingest::{self, StoreRequest},
    query::{QueryRequest, build_query},
};
use axum::{
    Router,
    extract::State,
    response::Json,
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/make-request", post(make_request))
        .route("/add-to-database", post(add_to_database))
}

async fn make_request(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.has_no_terms() {
        return Err(ApiError::Validation(
            "At least one of and_keywords, and_exact_phrases, or_keywords, or_exact_phrases must be provided"
                .to_string(),
        ));
    }

    let query = build_query(&request);
    let url = state.locale.search_url(&query.query);
    info!("Fetching Google RSS: {}", url);

    let items = state.feed.fetch(&url).await.map_err(|e| {
        if e.is_rate_limited() { ApiError::RateLimited } else { ApiError::Feed(e) }
    })?;

    Ok(Json(json!({
        "success": true,
        "url": url,
        "query": query.query,
        "timeRangeInvalid": query.time_range_invalid,
        "count": items.len(),
        "articlesArray": items,
    })))
}

#[derive(Debug, Deserialize)]
struct AddToDatabaseBody {
    #[serde(rename = "articlesArray", default)]
    articles_array: Option<Vec<RssItem>>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    and_keywords: Option<String>,
    #[serde(default)]
    and_exact_phrases: Option<String>,
    #[serde(default)]
    or_keywords: Option<String>,
    #[serde(default)]
    or_exact_phrases: Option<String>,
}

fn join_present(parts: [&Option<String>; 2]) -> Option<String> {
    let present: Vec<&str> =
        parts.into_iter().filter_map(|p| p.as_deref()).filter(|p| !p.is_empty()).collect();
    if present.is_empty() { None } else { Some(present.join(", ")) }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

fn validate_articles(articles: &[RssItem]) -> Result<(), ApiError> {
    for article in articles {
        if !has_text(article.title.as_deref()) || !has_text(article.link.as_deref()) {
            return Err(ApiError::InvalidRequest(
                "Each article must have at least title and link fields".to_string(),
            ));
        }
        if article.description.is_empty() && !has_text(article.content.as_deref()) {
            return Err(ApiError::InvalidRequest(
                "Each article must have at least one of description or content".to_string(),
            ));
        }
    }
    Ok(())
}

async fn add_to_database(
    State(state): State<ApiState>,
    ApiJson(body): ApiJson<AddToDatabaseBody>,
) -> Result<Json<Value>, ApiError> {
    let articles = body.articles_array.as_deref().unwrap_or_default();
    if articles.is_empty() {
        return Err(ApiError::InvalidRequest("articlesArray must be a non-empty array".to_string()));
    }

    let Some(url) = body.url.as_deref().filter(|u| !u.is_empty()) else {
        return Err(ApiError::InvalidRequest("url is required and must be a string".to_string()));
    };

    validate_articles(articles)?;

    if !url.contains("news.google.com/rss") {
        warn!("Unusual URL format (not Google News RSS): {}", url);
    }

    let source = ingest::ensure_google_rss_source(state.repo.as_ref()).await?;
    let outcome = ingest::store_request_and_articles(
        state.repo.as_ref(),
        StoreRequest {
            request_url: url,
            and_string: join_present([&body.and_keywords, &body.and_exact_phrases]),
            or_string: join_present([&body.or_keywords, &body.or_exact_phrases]),
            status: RequestStatus::Success,
            items: articles,
            source,
            is_from_automation: false,
        },
    )
    .await?;

    let duplicates = outcome.duplicates_skipped();
    let mut message = format!(
        "Successfully saved {} of {} articles to database",
        outcome.articles_saved, outcome.articles_received
    );
    if duplicates > 0 {
        let plural = if duplicates > 1 { "s" } else { "" };
        message.push_str(&format!(" ({} duplicate{} skipped)", duplicates, plural));
    }

    Ok(Json(json!({
        "success": true,
        "newsApiRequestId": outcome.news_api_request_id,
        "articlesReceived": outcome.articles_received,
        "articlesSaved": outcome.articles_saved,
        "articleIds": outcome.article_ids,
        "message": message,
    })))
}
