//! News API (newsapi.org) keyword search.
//!
//! Only the `everything` endpoint is used: one keyword string over a date
//! window, English articles, first page of up to 100 results.
pub mod client;

pub use client::HttpNewsApiClient;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Window searched when no start date is given, ending today
pub const DEFAULT_LOOKBACK_DAYS: i64 = 29;

#[derive(Debug, Error)]
pub enum NewsApiError {
    #[error("News API key is not configured")]
    MissingApiKey,

    #[error("News API request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("News API returned a non-JSON body (status {status}): {message}")]
    InvalidBody { status: u16, message: String },

    #[error("Invalid News API base URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsApiQuery {
    pub keyword: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub page_size: u32,
}

impl NewsApiQuery {
    /// Missing dates default to the last `DEFAULT_LOOKBACK_DAYS` days up to `today`.
    pub fn new(
        keyword: impl Into<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            start_date: start_date.unwrap_or(today - Duration::days(DEFAULT_LOOKBACK_DAYS)),
            end_date: end_date.unwrap_or(today),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsApiArticleSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiArticle {
    #[serde(default)]
    pub source: NewsApiArticleSource,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Body of an `everything` answer; errors carry `status: "error"` and a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total_results: Option<i64>,
    #[serde(default)]
    pub articles: Option<Vec<NewsApiArticle>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsApiResponse {
    pub http_status: u16,
    /// Request URL without the API key
    pub request_url: String,
    pub payload: NewsApiPayload,
}

impl NewsApiResponse {
    /// A 2xx answer that carries an article list
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
            && self.payload.status.as_deref() != Some("error")
            && self.payload.articles.is_some()
    }

    pub fn articles(&self) -> &[NewsApiArticle] {
        self.payload.articles.as_deref().unwrap_or_default()
    }

    pub fn error_message(&self) -> String {
        self.payload
            .message
            .clone()
            .unwrap_or_else(|| format!("News API request failed with status {}", self.http_status))
    }
}

#[async_trait]
pub trait NewsApiClient: Send + Sync {
    async fn everything(&self, query: &NewsApiQuery) -> Result<NewsApiResponse, NewsApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(http_status: u16, payload: NewsApiPayload) -> NewsApiResponse {
        NewsApiResponse { http_status, request_url: String::new(), payload }
    }

    #[test]
    fn test_query_defaults_to_last_29_days() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let query = NewsApiQuery::new("crib recall", None, None, today);
        assert_eq!(query.start_date, NaiveDate::from_ymd_opt(2026, 9, 19).unwrap());
        assert_eq!(query.end_date, today);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);

        let start = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        assert_eq!(NewsApiQuery::new("recall", Some(start), None, today).start_date, start);
    }

    #[test]
    fn test_success_needs_2xx_and_articles() {
        let ok = NewsApiPayload {
            status: Some("ok".to_string()),
            articles: Some(Vec::new()),
            ..Default::default()
        };
        assert!(response(200, ok.clone()).is_success());
        assert!(!response(429, ok).is_success());

        let error = NewsApiPayload {
            status: Some("error".to_string()),
            message: Some("Your API key is invalid".to_string()),
            ..Default::default()
        };
        let failed = response(200, error);
        assert!(!failed.is_success());
        assert_eq!(failed.error_message(), "Your API key is invalid");

        let empty = response(500, NewsApiPayload::default());
        assert!(!empty.is_success());
        assert!(empty.articles().is_empty());
        assert_eq!(empty.error_message(), "News API request failed with status 500");
    }
}
