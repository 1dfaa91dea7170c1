//! Repository trait for NewsNexus persistence
use crate::database::models::{
    AiScore, ArticleApproved, ArticleDetailRow, ArticleListFilter, ArticleReportContract,
    ArticleRow, ArticleStateContract, ArticleStateRow, NewArticle, NewNewsRequest, Report, State,
    StateAssignmentFilter, StateAssignmentRow,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Repository error type
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Storage operations used by the API and the automation job
#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Whether the backing store answers queries
    async fn check_connection(&self) -> Result<bool>;

    // Sources and requests

    /// Id of the aggregator source named `name_of_org`, creating it if absent
    async fn find_or_create_aggregator_source(
        &self,
        name_of_org: &str,
        is_rss: bool,
        is_api: bool,
    ) -> Result<i64>;

    /// Id of the finder entity for an aggregator source, creating it if absent
    async fn find_or_create_finder_entity(&self, source_id: i64) -> Result<i64>;

    async fn create_news_request(&self, request: NewNewsRequest) -> Result<i64>;

    async fn set_request_saved_count(&self, request_id: i64, saved: i32) -> Result<()>;

    /// Whether a request for `url` was already recorded on `date`
    async fn request_made_on(&self, url: &str, date: NaiveDate) -> Result<bool>;

    // Articles

    /// Insert the article unless its URL is already stored; `None` for a duplicate
    async fn create_article_if_new(&self, article: NewArticle) -> Result<Option<i64>>;

    async fn create_article_content(&self, article_id: i64, content: &str) -> Result<()>;

    /// Articles ordered by id, with the terms of the request that found them
    async fn list_articles(&self, filter: ArticleListFilter) -> Result<Vec<ArticleRow>>;

    /// Every human-assigned article state, ordered by article id
    async fn article_state_rows(&self) -> Result<Vec<ArticleStateRow>>;

    /// Approval rows with `is_approved` set, ordered by article id
    async fn approved_articles(&self) -> Result<Vec<ArticleApproved>>;

    /// Ids of articles a reviewer marked as not relevant
    async fn not_relevant_article_ids(&self) -> Result<Vec<i64>>;

    /// Delete the article and everything attached to it; false when absent
    async fn delete_article(&self, article_id: i64) -> Result<bool>;

    // States

    async fn list_states(&self) -> Result<Vec<State>>;

    /// Replace the human-approved states of an article
    async fn replace_article_states(
        &self,
        article_id: i64,
        state_ids: &[i64],
    ) -> Result<Vec<ArticleStateContract>>;

    // Reports

    async fn list_reports(&self) -> Result<Vec<Report>>;

    async fn update_report_submitted_date(
        &self,
        report_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Report>>;

    async fn find_article_report_contract(&self, id: i64) -> Result<Option<ArticleReportContract>>;

    async fn save_article_report_contract(&self, contract: &ArticleReportContract) -> Result<()>;

    async fn article_ids_for_report(&self, report_id: i64) -> Result<Vec<i64>>;

    /// Every article/report link, ordered by id
    async fn list_article_report_contracts(&self) -> Result<Vec<ArticleReportContract>>;

    // AI state assignments

    async fn articles_with_state_assignments(
        &self,
        filter: StateAssignmentFilter,
    ) -> Result<Vec<StateAssignmentRow>>;

    /// Scores given by the AI entity named `ai_name`; `None` when that
    /// entity or its categorizer is not registered.
    async fn ai_scores(&self, ai_name: &str, article_ids: &[i64]) -> Result<Option<Vec<AiScore>>>;

    async fn ai_state_assignment_exists(&self, article_id: i64, state_id: i64) -> Result<bool>;

    async fn set_ai_state_approval(
        &self,
        article_id: i64,
        state_id: i64,
        is_human_approved: bool,
    ) -> Result<()>;

    async fn human_state_exists(&self, article_id: i64, state_id: i64) -> Result<bool>;

    async fn create_human_state(&self, article_id: i64, state_id: i64) -> Result<()>;

    async fn delete_human_state(&self, article_id: i64, state_id: i64) -> Result<()>;

    async fn article_detail_rows(&self, article_id: i64) -> Result<Vec<ArticleDetailRow>>;
}
