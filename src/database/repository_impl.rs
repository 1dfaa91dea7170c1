//! PostgreSQL implementation of the repository trait

use crate::database::{
    client::Database,
    models::{
        AiScore, ArticleApproved, ArticleDetailRow, ArticleListFilter, ArticleReportContract,
        ArticleRow, ArticleStateContract, ArticleStateRow, NewArticle, NewNewsRequest, Report,
        State, StateAssignmentFilter, StateAssignmentRow,
    },
    repository::{NewsRepository, RepositoryError, Result},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use std::sync::Arc;
use tracing::{debug, info};

const REPORT_COLUMNS: &str =
    "id, name_cr_format, name_zip_file, date_submitted_to_client, created_at";

const CONTRACT_COLUMNS: &str = "id, report_id, article_id, article_reference_number_in_report,
    article_accepted_by_cpsc, article_rejection_reason";

/// PostgreSQL-backed news repository
pub struct PostgresNewsRepository {
    db: Arc<Database>,
}

impl PostgresNewsRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NewsRepository for PostgresNewsRepository {
    async fn check_connection(&self) -> Result<bool> {
        self.db
            .check_connection()
            .await
            .map_err(|e| RepositoryError::Other(e.to_string()))
    }

    async fn find_or_create_aggregator_source(
        &self,
        name_of_org: &str,
        is_rss: bool,
        is_api: bool,
    ) -> Result<i64> {
        // xmax = 0 only for freshly inserted tuples
        let row = sqlx::query(
            "INSERT INTO news_article_aggregator_sources (name_of_org, is_rss, is_api)
             VALUES ($1, $2, $3)
             ON CONFLICT (name_of_org) DO UPDATE SET name_of_org = EXCLUDED.name_of_org
             RETURNING id, (xmax = 0) AS inserted",
        )
        .bind(name_of_org)
        .bind(is_rss)
        .bind(is_api)
        .fetch_one(&self.db.pool)
        .await?;

        if row.try_get::<bool, _>("inserted")? {
            info!("Created news aggregator source: {}", name_of_org);
        }
        Ok(row.try_get("id")?)
    }

    async fn find_or_create_finder_entity(&self, source_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO entity_who_found_articles (news_article_aggregator_source_id)
             VALUES ($1)
             ON CONFLICT (news_article_aggregator_source_id)
             DO UPDATE SET news_article_aggregator_source_id = EXCLUDED.news_article_aggregator_source_id
             RETURNING id, (xmax = 0) AS inserted",
        )
        .bind(source_id)
        .fetch_one(&self.db.pool)
        .await?;

        if row.try_get::<bool, _>("inserted")? {
            info!("Created article finder entity for source {}", source_id);
        }
        Ok(row.try_get("id")?)
    }

    async fn create_news_request(&self, request: NewNewsRequest) -> Result<i64> {
        let id = sqlx::query_scalar(
            "INSERT INTO news_api_requests (
                news_article_aggregator_source_id, date_start_of_request, date_end_of_request,
                count_of_articles_received_from_request, status, url,
                and_string, or_string, not_string, is_from_automation
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING id",
        )
        .bind(request.news_article_aggregator_source_id)
        .bind(request.date_start_of_request)
        .bind(request.date_end_of_request)
        .bind(request.count_of_articles_received)
        .bind(request.status.as_str())
        .bind(&request.url)
        .bind(&request.and_string)
        .bind(&request.or_string)
        .bind(&request.not_string)
        .bind(request.is_from_automation)
        .fetch_one(&self.db.pool)
        .await?;

        Ok(id)
    }

    async fn set_request_saved_count(&self, request_id: i64, saved: i32) -> Result<()> {
        sqlx::query(
            "UPDATE news_api_requests SET count_of_articles_saved_to_db_from_request = $2
             WHERE id = $1",
        )
        .bind(request_id)
        .bind(saved)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn request_made_on(&self, url: &str, date: NaiveDate) -> Result<bool> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM news_api_requests WHERE url = $1 AND date_end_of_request = $2
             )",
        )
        .bind(url)
        .bind(date)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(exists)
    }

    async fn create_article_if_new(&self, article: NewArticle) -> Result<Option<i64>> {
        let id = sqlx::query_scalar(
            "INSERT INTO articles (
                publication_name, title, author, description, url, url_to_image, published_date,
                entity_who_found_article_id, news_api_request_id
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (url) DO NOTHING
             RETURNING id",
        )
        .bind(&article.publication_name)
        .bind(&article.title)
        .bind(&article.author)
        .bind(&article.description)
        .bind(&article.url)
        .bind(&article.url_to_image)
        .bind(article.published_date)
        .bind(article.entity_who_found_article_id)
        .bind(article.news_api_request_id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(id)
    }

    async fn create_article_content(&self, article_id: i64, content: &str) -> Result<()> {
        sqlx::query("INSERT INTO article_contents (article_id, content) VALUES ($1, $2)")
            .bind(article_id)
            .bind(content)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn list_articles(&self, filter: ArticleListFilter) -> Result<Vec<ArticleRow>> {
        let rows = sqlx::query_as(
            "SELECT
                a.id, a.title, a.description, a.publication_name, a.author, a.url,
                a.url_to_image, a.published_date, a.created_at,
                a.entity_who_found_article_id, a.news_api_request_id,
                nar.and_string, nar.or_string, nar.not_string
             FROM articles a
             LEFT JOIN news_api_requests nar ON nar.id = a.news_api_request_id
             WHERE ($1::timestamptz IS NULL OR a.published_date >= $1)
               AND ($2::timestamptz IS NULL OR a.created_at >= $2)
             ORDER BY a.id",
        )
        .bind(filter.published_on_or_after)
        .bind(filter.created_on_or_after)
        .fetch_all(&self.db.pool)
        .await?;

        debug!("Listed {} articles", rows.len());
        Ok(rows)
    }

    async fn article_state_rows(&self) -> Result<Vec<ArticleStateRow>> {
        let rows = sqlx::query_as(
            "SELECT asc1.article_id, s.id AS state_id, s.name, s.abbreviation
             FROM article_state_contracts asc1
             JOIN states s ON s.id = asc1.state_id
             ORDER BY asc1.article_id, s.id",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }

    async fn approved_articles(&self) -> Result<Vec<ArticleApproved>> {
        let rows = sqlx::query_as(
            "SELECT id, article_id, user_id, is_approved, headline_for_pdf_report,
                    publication_name_for_pdf_report, publication_date_for_pdf_report,
                    text_for_pdf_report, url_for_pdf_report, km_notes, created_at
             FROM article_approveds
             WHERE is_approved
             ORDER BY article_id, id",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }

    async fn not_relevant_article_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT DISTINCT article_id FROM article_is_relevants ORDER BY article_id",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(ids)
    }

    async fn delete_article(&self, article_id: i64) -> Result<bool> {
        // Contents, states, approvals and report links cascade
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(article_id)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_states(&self) -> Result<Vec<State>> {
        let states = sqlx::query_as("SELECT id, name, abbreviation FROM states ORDER BY name")
            .fetch_all(&self.db.pool)
            .await?;
        Ok(states)
    }

    async fn replace_article_states(
        &self,
        article_id: i64,
        state_ids: &[i64],
    ) -> Result<Vec<ArticleStateContract>> {
        let mut tx = self.db.pool.begin().await?;

        sqlx::query("DELETE FROM article_state_contracts WHERE article_id = $1")
            .bind(article_id)
            .execute(&mut *tx)
            .await?;

        let mut contracts = Vec::with_capacity(state_ids.len());
        for &state_id in state_ids {
            sqlx::query(
                "INSERT INTO article_state_contracts (article_id, state_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(article_id)
            .bind(state_id)
            .execute(&mut *tx)
            .await?;
            contracts.push(ArticleStateContract { article_id, state_id });
        }

        tx.commit().await?;
        debug!("Article {} now has {} human-approved states", article_id, contracts.len());
        Ok(contracts)
    }

    async fn list_reports(&self) -> Result<Vec<Report>> {
        let sql = format!("SELECT {} FROM reports ORDER BY id", REPORT_COLUMNS);
        let reports = sqlx::query_as(&sql).fetch_all(&self.db.pool).await?;
        Ok(reports)
    }

    async fn update_report_submitted_date(
        &self,
        report_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Report>> {
        let sql = format!(
            "UPDATE reports SET date_submitted_to_client = $2 WHERE id = $1 RETURNING {}",
            REPORT_COLUMNS
        );
        let report = sqlx::query_as(&sql)
            .bind(report_id)
            .bind(date.format("%Y-%m-%d").to_string())
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(report)
    }

    async fn find_article_report_contract(&self, id: i64) -> Result<Option<ArticleReportContract>> {
        let sql = format!("SELECT {} FROM article_report_contracts WHERE id = $1", CONTRACT_COLUMNS);
        let contract = sqlx::query_as(&sql).bind(id).fetch_optional(&self.db.pool).await?;
        Ok(contract)
    }

    async fn save_article_report_contract(&self, contract: &ArticleReportContract) -> Result<()> {
        sqlx::query(
            "UPDATE article_report_contracts
             SET article_accepted_by_cpsc = $2, article_rejection_reason = $3
             WHERE id = $1",
        )
        .bind(contract.id)
        .bind(contract.article_accepted_by_cpsc)
        .bind(&contract.article_rejection_reason)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn article_ids_for_report(&self, report_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT article_id FROM article_report_contracts WHERE report_id = $1 ORDER BY id",
        )
        .bind(report_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(ids)
    }

    async fn list_article_report_contracts(&self) -> Result<Vec<ArticleReportContract>> {
        let sql = format!("SELECT {} FROM article_report_contracts ORDER BY id", CONTRACT_COLUMNS);
        let contracts = sqlx::query_as(&sql).fetch_all(&self.db.pool).await?;
        Ok(contracts)
    }

    async fn articles_with_state_assignments(
        &self,
        filter: StateAssignmentFilter,
    ) -> Result<Vec<StateAssignmentRow>> {
        let days = filter.published_within_days.map(|d| i32::try_from(d).unwrap_or(i32::MAX));

        let rows = sqlx::query_as(
            "SELECT
                a.id AS article_id, a.title, a.description, a.url, a.created_at, a.published_date,
                asc02.prompt_id, asc02.is_human_approved, asc02.is_determined_to_be_error,
                asc02.occured_in_the_us, asc02.reasoning, asc02.state_id,
                s.name AS state_name
             FROM articles a
             INNER JOIN article_state_contracts02 asc02 ON asc02.article_id = a.id
             LEFT JOIN states s ON s.id = asc02.state_id
             WHERE (asc02.state_id IS NULL) = $1
               AND ($2::int IS NULL OR a.published_date > NOW() - make_interval(days => $2::int))
             ORDER BY a.created_at DESC",
        )
        .bind(filter.include_null_state)
        .bind(days)
        .fetch_all(&self.db.pool)
        .await?;

        debug!("Found {} articles with state assignments", rows.len());
        Ok(rows)
    }

    async fn ai_scores(&self, ai_name: &str, article_ids: &[i64]) -> Result<Option<Vec<AiScore>>> {
        let entity_id: Option<i64> = sqlx::query_scalar(
            "SELECT ewc.id
             FROM artificial_intelligences ai
             JOIN entity_who_categorized_articles ewc ON ewc.artificial_intelligence_id = ai.id
             WHERE ai.name = $1
             ORDER BY ewc.id
             LIMIT 1",
        )
        .bind(ai_name)
        .fetch_optional(&self.db.pool)
        .await?;

        let Some(entity_id) = entity_id else {
            return Ok(None);
        };

        let scores = sqlx::query_as(
            "SELECT article_id, keyword, keyword_rating
             FROM article_entity_who_categorized_article_contracts
             WHERE entity_who_categorizes_id = $1 AND article_id = ANY($2)
             ORDER BY article_id, keyword_rating DESC NULLS LAST",
        )
        .bind(entity_id)
        .bind(article_ids)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(Some(scores))
    }

    async fn ai_state_assignment_exists(&self, article_id: i64, state_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM article_state_contracts02 WHERE article_id = $1 AND state_id = $2
             )",
        )
        .bind(article_id)
        .bind(state_id)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(exists)
    }

    async fn set_ai_state_approval(
        &self,
        article_id: i64,
        state_id: i64,
        is_human_approved: bool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE article_state_contracts02 SET is_human_approved = $3
             WHERE article_id = $1 AND state_id = $2",
        )
        .bind(article_id)
        .bind(state_id)
        .bind(is_human_approved)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn human_state_exists(&self, article_id: i64, state_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM article_state_contracts WHERE article_id = $1 AND state_id = $2
             )",
        )
        .bind(article_id)
        .bind(state_id)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(exists)
    }

    async fn create_human_state(&self, article_id: i64, state_id: i64) -> Result<()> {
        sqlx::query("INSERT INTO article_state_contracts (article_id, state_id) VALUES ($1, $2)")
            .bind(article_id)
            .bind(state_id)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn delete_human_state(&self, article_id: i64, state_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM article_state_contracts WHERE article_id = $1 AND state_id = $2")
            .bind(article_id)
            .bind(state_id)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn article_detail_rows(&self, article_id: i64) -> Result<Vec<ArticleDetailRow>> {
        let rows = sqlx::query_as(
            "SELECT
                a.id AS article_id, a.title, a.description, a.url,
                ac.content AS article_content,
                hsc.state_id AS human_state_id, s1.name AS human_state_name,
                asc02.state_id AS ai_state_id, s2.name AS ai_state_name,
                asc02.prompt_id AS ai_prompt_id,
                asc02.is_human_approved AS ai_is_human_approved,
                asc02.reasoning AS ai_reasoning
             FROM articles a
             LEFT JOIN article_contents ac ON ac.article_id = a.id
             LEFT JOIN article_state_contracts hsc ON hsc.article_id = a.id
             LEFT JOIN states s1 ON s1.id = hsc.state_id
             LEFT JOIN article_state_contracts02 asc02 ON asc02.article_id = a.id
             LEFT JOIN states s2 ON s2.id = asc02.state_id
             WHERE a.id = $1",
        )
        .bind(article_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows)
    }
}
