//! Row types for the NewsNexus schema.
//!
//! Serialized field names follow the portal's camelCase convention.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Name of the aggregator source row used for Google News RSS requests
pub const GOOGLE_NEWS_RSS_ORG_NAME: &str = "Google News RSS";

/// Name of the aggregator source row used for News API requests
pub const NEWS_API_ORG_NAME: &str = "NewsAPI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStateContract {
    pub article_id: i64,
    pub state_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// A request made to a news source, recorded before its articles are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNewsRequest {
    pub news_article_aggregator_source_id: i64,
    pub date_start_of_request: Option<NaiveDate>,
    pub date_end_of_request: NaiveDate,
    pub count_of_articles_received: i32,
    pub status: RequestStatus,
    pub url: String,
    pub and_string: Option<String>,
    pub or_string: Option<String>,
    pub not_string: Option<String>,
    pub is_from_automation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub publication_name: String,
    pub title: String,
    pub author: Option<String>,
    pub description: String,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub entity_who_found_article_id: i64,
    pub news_api_request_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub name_cr_format: Option<String>,
    pub name_zip_file: Option<String>,
    /// Stored as text by older portal versions, so it is not guaranteed to be a date
    pub date_submitted_to_client: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArticleReportContract {
    pub id: i64,
    pub report_id: i64,
    pub article_id: i64,
    pub article_reference_number_in_report: Option<String>,
    pub article_accepted_by_cpsc: bool,
    pub article_rejection_reason: Option<String>,
}

/// Filter for articles carrying an AI state assignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateAssignmentFilter {
    /// Select assignments whose state is null instead of non-null
    pub include_null_state: bool,
    /// Keep articles published within this many days
    pub published_within_days: Option<u32>,
}

/// Article joined with its AI state assignment
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StateAssignmentRow {
    pub article_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub published_date: Option<DateTime<Utc>>,
    pub prompt_id: Option<i64>,
    pub is_human_approved: Option<bool>,
    pub is_determined_to_be_error: Option<bool>,
    pub occured_in_the_us: Option<bool>,
    pub reasoning: Option<String>,
    pub state_id: Option<i64>,
    pub state_name: Option<String>,
}

/// Score an AI categorizer gave an article
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AiScore {
    pub article_id: i64,
    pub keyword: Option<String>,
    pub keyword_rating: Option<f64>,
}

/// One row of the article detail join; an article with several human
/// states yields several rows.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ArticleDetailRow {
    pub article_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub article_content: Option<String>,
    pub human_state_id: Option<i64>,
    pub human_state_name: Option<String>,
    pub ai_state_id: Option<i64>,
    pub ai_state_name: Option<String>,
    pub ai_prompt_id: Option<i64>,
    pub ai_is_human_approved: Option<bool>,
    pub ai_reasoning: Option<String>,
}

/// Date bounds for listing articles; both are inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleListFilter {
    pub published_on_or_after: Option<DateTime<Utc>>,
    pub created_on_or_after: Option<DateTime<Utc>>,
}

/// Article joined with the search terms of the request that found it
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub publication_name: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub entity_who_found_article_id: Option<i64>,
    pub news_api_request_id: Option<i64>,
    pub and_string: Option<String>,
    pub or_string: Option<String>,
    pub not_string: Option<String>,
}

/// Human-assigned state of an article
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ArticleStateRow {
    pub article_id: i64,
    pub state_id: i64,
    pub name: String,
    pub abbreviation: String,
}

/// Reviewer approval of an article, with the text used in PDF reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArticleApproved {
    pub id: i64,
    pub article_id: i64,
    pub user_id: Option<i64>,
    pub is_approved: bool,
    pub headline_for_pdf_report: Option<String>,
    pub publication_name_for_pdf_report: Option<String>,
    pub publication_date_for_pdf_report: Option<String>,
    pub text_for_pdf_report: Option<String>,
    pub url_for_pdf_report: Option<String>,
    pub km_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
