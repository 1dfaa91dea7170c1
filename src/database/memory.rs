//! In-memory repository used by tests and local dry runs.

use crate::database::{
    models::{
        AiScore, ArticleApproved, ArticleDetailRow, ArticleListFilter, ArticleReportContract,
        ArticleRow, ArticleStateContract, ArticleStateRow, NewArticle, NewNewsRequest, Report,
        State, StateAssignmentFilter, StateAssignmentRow,
    },
    repository::{NewsRepository, RepositoryError, Result},
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// AI state assignment as held by the in-memory store
#[derive(Debug, Clone, Default)]
pub struct AiStateAssignment {
    pub article_id: i64,
    pub state_id: Option<i64>,
    pub prompt_id: Option<i64>,
    pub is_human_approved: bool,
    pub is_determined_to_be_error: bool,
    pub occured_in_the_us: Option<bool>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredRequest {
    pub id: i64,
    pub request: NewNewsRequest,
    pub saved_count: i32,
}

#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub id: i64,
    pub article: NewArticle,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryData {
    next_id: i64,
    pub sources: Vec<(i64, String)>,
    pub finder_entities: Vec<(i64, i64)>,
    pub requests: Vec<StoredRequest>,
    pub articles: Vec<StoredArticle>,
    pub contents: Vec<(i64, String)>,
    pub states: Vec<State>,
    pub human_states: Vec<ArticleStateContract>,
    pub ai_states: Vec<AiStateAssignment>,
    /// AI entity name -> scores it produced
    pub ai_scores: HashMap<String, Vec<AiScore>>,
    pub reports: Vec<Report>,
    pub report_contracts: Vec<ArticleReportContract>,
    pub approvals: Vec<ArticleApproved>,
    /// Article ids a reviewer marked as not relevant
    pub not_relevant: Vec<i64>,
}

impl MemoryData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Repository keeping every table in process memory
#[derive(Debug, Default)]
pub struct InMemoryNewsRepository {
    data: Mutex<MemoryData>,
}

impl InMemoryNewsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the underlying tables, for seeding and inspection.
    pub fn with_data<R>(&self, f: impl FnOnce(&mut MemoryData) -> R) -> R {
        f(&mut self.data.lock())
    }

    /// Insert an article directly, bypassing ingest; returns its id.
    pub fn seed_article(&self, url: &str, title: &str) -> i64 {
        let mut data = self.data.lock();
        let id = data.next_id();
        data.articles.push(StoredArticle {
            id,
            article: NewArticle {
                publication_name: "Seed".to_string(),
                title: title.to_string(),
                author: None,
                description: String::new(),
                url: url.to_string(),
                url_to_image: None,
                published_date: Some(Utc::now()),
                entity_who_found_article_id: 0,
                news_api_request_id: 0,
            },
            created_at: Utc::now(),
        });
        id
    }

    /// Record a reviewer approval (or withdrawn approval) of an article.
    pub fn seed_approval(&self, article_id: i64, is_approved: bool) -> i64 {
        let mut data = self.data.lock();
        let id = data.next_id();
        data.approvals.push(ArticleApproved {
            id,
            article_id,
            user_id: None,
            is_approved,
            headline_for_pdf_report: None,
            publication_name_for_pdf_report: None,
            publication_date_for_pdf_report: None,
            text_for_pdf_report: None,
            url_for_pdf_report: None,
            km_notes: None,
            created_at: Utc::now(),
        });
        id
    }
}

#[async_trait]
impl NewsRepository for InMemoryNewsRepository {
    async fn check_connection(&self) -> Result<bool> {
        Ok(true)
    }

    async fn find_or_create_aggregator_source(
        &self,
        name_of_org: &str,
        _is_rss: bool,
        _is_api: bool,
    ) -> Result<i64> {
        let mut data = self.data.lock();
        if let Some((id, _)) = data.sources.iter().find(|(_, name)| name == name_of_org) {
            return Ok(*id);
        }
        let id = data.next_id();
        data.sources.push((id, name_of_org.to_string()));
        Ok(id)
    }

    async fn find_or_create_finder_entity(&self, source_id: i64) -> Result<i64> {
        let mut data = self.data.lock();
        if let Some((id, _)) = data.finder_entities.iter().find(|(_, s)| *s == source_id) {
            return Ok(*id);
        }
        let id = data.next_id();
        data.finder_entities.push((id, source_id));
        Ok(id)
    }

    async fn create_news_request(&self, request: NewNewsRequest) -> Result<i64> {
        let mut data = self.data.lock();
        let id = data.next_id();
        data.requests.push(StoredRequest { id, request, saved_count: 0 });
        Ok(id)
    }

    async fn set_request_saved_count(&self, request_id: i64, saved: i32) -> Result<()> {
        let mut data = self.data.lock();
        let stored = data
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("request {}", request_id)))?;
        stored.saved_count = saved;
        Ok(())
    }

    async fn request_made_on(&self, url: &str, date: NaiveDate) -> Result<bool> {
        let data = self.data.lock();
        Ok(data
            .requests
            .iter()
            .any(|r| r.request.url == url && r.request.date_end_of_request == date))
    }

    async fn create_article_if_new(&self, article: NewArticle) -> Result<Option<i64>> {
        let mut data = self.data.lock();
        if data.articles.iter().any(|a| a.article.url == article.url) {
            return Ok(None);
        }
        let id = data.next_id();
        data.articles.push(StoredArticle { id, article, created_at: Utc::now() });
        Ok(Some(id))
    }

    async fn create_article_content(&self, article_id: i64, content: &str) -> Result<()> {
        self.data.lock().contents.push((article_id, content.to_string()));
        Ok(())
    }

    async fn list_articles(&self, filter: ArticleListFilter) -> Result<Vec<ArticleRow>> {
        let data = self.data.lock();
        let mut rows: Vec<_> = data
            .articles
            .iter()
            .filter(|stored| {
                filter.published_on_or_after.is_none_or(|after| {
                    stored.article.published_date.is_some_and(|published| published >= after)
                })
            })
            .filter(|stored| filter.created_on_or_after.is_none_or(|after| stored.created_at >= after))
            .map(|stored| {
                let request = data
                    .requests
                    .iter()
                    .find(|r| r.id == stored.article.news_api_request_id)
                    .map(|r| &r.request);
                ArticleRow {
                    id: stored.id,
                    title: Some(stored.article.title.clone()),
                    description: Some(stored.article.description.clone()),
                    publication_name: Some(stored.article.publication_name.clone()),
                    author: stored.article.author.clone(),
                    url: Some(stored.article.url.clone()),
                    url_to_image: stored.article.url_to_image.clone(),
                    published_date: stored.article.published_date,
                    created_at: stored.created_at,
                    entity_who_found_article_id: Some(stored.article.entity_who_found_article_id),
                    news_api_request_id: request.map(|_| stored.article.news_api_request_id),
                    and_string: request.and_then(|r| r.and_string.clone()),
                    or_string: request.and_then(|r| r.or_string.clone()),
                    not_string: request.and_then(|r| r.not_string.clone()),
                }
            })
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    async fn article_state_rows(&self) -> Result<Vec<ArticleStateRow>> {
        let data = self.data.lock();
        let mut rows: Vec<_> = data
            .human_states
            .iter()
            .filter_map(|contract| {
                let state = data.states.iter().find(|s| s.id == contract.state_id)?;
                Some(ArticleStateRow {
                    article_id: contract.article_id,
                    state_id: state.id,
                    name: state.name.clone(),
                    abbreviation: state.abbreviation.clone(),
                })
            })
            .collect();
        rows.sort_by_key(|row| (row.article_id, row.state_id));
        Ok(rows)
    }

    async fn approved_articles(&self) -> Result<Vec<ArticleApproved>> {
        let mut approvals: Vec<_> =
            self.data.lock().approvals.iter().filter(|a| a.is_approved).cloned().collect();
        approvals.sort_by_key(|a| (a.article_id, a.id));
        Ok(approvals)
    }

    async fn not_relevant_article_ids(&self) -> Result<Vec<i64>> {
        let mut ids = self.data.lock().not_relevant.clone();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn delete_article(&self, article_id: i64) -> Result<bool> {
        let mut data = self.data.lock();
        let before = data.articles.len();
        data.articles.retain(|a| a.id != article_id);
        if data.articles.len() == before {
            return Ok(false);
        }

        data.contents.retain(|(id, _)| *id != article_id);
        data.human_states.retain(|c| c.article_id != article_id);
        data.ai_states.retain(|ai| ai.article_id != article_id);
        data.report_contracts.retain(|c| c.article_id != article_id);
        data.approvals.retain(|a| a.article_id != article_id);
        data.not_relevant.retain(|id| *id != article_id);
        Ok(true)
    }

    async fn list_states(&self) -> Result<Vec<State>> {
        let mut states = self.data.lock().states.clone();
        states.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(states)
    }

    async fn replace_article_states(
        &self,
        article_id: i64,
        state_ids: &[i64],
    ) -> Result<Vec<ArticleStateContract>> {
        let mut data = self.data.lock();
        data.human_states.retain(|c| c.article_id != article_id);
        let contracts: Vec<_> =
            state_ids.iter().map(|&state_id| ArticleStateContract { article_id, state_id }).collect();
        data.human_states.extend(contracts.iter().copied());
        Ok(contracts)
    }

    async fn list_reports(&self) -> Result<Vec<Report>> {
        Ok(self.data.lock().reports.clone())
    }

    async fn update_report_submitted_date(
        &self,
        report_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Report>> {
        let mut data = self.data.lock();
        Ok(data.reports.iter_mut().find(|r| r.id == report_id).map(|report| {
            report.date_submitted_to_client = Some(date.format("%Y-%m-%d").to_string());
            report.clone()
        }))
    }

    async fn find_article_report_contract(&self, id: i64) -> Result<Option<ArticleReportContract>> {
        Ok(self.data.lock().report_contracts.iter().find(|c| c.id == id).cloned())
    }

    async fn save_article_report_contract(&self, contract: &ArticleReportContract) -> Result<()> {
        let mut data = self.data.lock();
        let stored = data
            .report_contracts
            .iter_mut()
            .find(|c| c.id == contract.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("contract {}", contract.id)))?;
        *stored = contract.clone();
        Ok(())
    }

    async fn article_ids_for_report(&self, report_id: i64) -> Result<Vec<i64>> {
        Ok(self
            .data
            .lock()
            .report_contracts
            .iter()
            .filter(|c| c.report_id == report_id)
            .map(|c| c.article_id)
            .collect())
    }

    async fn list_article_report_contracts(&self) -> Result<Vec<ArticleReportContract>> {
        let mut contracts = self.data.lock().report_contracts.clone();
        contracts.sort_by_key(|c| c.id);
        Ok(contracts)
    }

    async fn articles_with_state_assignments(
        &self,
        filter: StateAssignmentFilter,
    ) -> Result<Vec<StateAssignmentRow>> {
        let data = self.data.lock();
        let cutoff = filter.published_within_days.and_then(|d| {
            Duration::try_days(d.into()).and_then(|age| Utc::now().checked_sub_signed(age))
        });

        let mut rows: Vec<_> = data
            .ai_states
            .iter()
            .filter(|ai| ai.state_id.is_none() == filter.include_null_state)
            .filter_map(|ai| {
                let stored = data.articles.iter().find(|a| a.id == ai.article_id)?;
                if let Some(cutoff) = cutoff {
                    if stored.article.published_date.is_none_or(|p| p <= cutoff) {
                        return None;
                    }
                }
                let state_name = ai
                    .state_id
                    .and_then(|id| data.states.iter().find(|s| s.id == id))
                    .map(|s| s.name.clone());
                Some(StateAssignmentRow {
                    article_id: stored.id,
                    title: Some(stored.article.title.clone()),
                    description: Some(stored.article.description.clone()),
                    url: Some(stored.article.url.clone()),
                    created_at: stored.created_at,
                    published_date: stored.article.published_date,
                    prompt_id: ai.prompt_id,
                    is_human_approved: Some(ai.is_human_approved),
                    is_determined_to_be_error: Some(ai.is_determined_to_be_error),
                    occured_in_the_us: ai.occured_in_the_us,
                    reasoning: ai.reasoning.clone(),
                    state_id: ai.state_id,
                    state_name,
                })
            })
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn ai_scores(&self, ai_name: &str, article_ids: &[i64]) -> Result<Option<Vec<AiScore>>> {
        let data = self.data.lock();
        Ok(data.ai_scores.get(ai_name).map(|scores| {
            scores.iter().filter(|s| article_ids.contains(&s.article_id)).cloned().collect()
        }))
    }

    async fn ai_state_assignment_exists(&self, article_id: i64, state_id: i64) -> Result<bool> {
        Ok(self
            .data
            .lock()
            .ai_states
            .iter()
            .any(|ai| ai.article_id == article_id && ai.state_id == Some(state_id)))
    }

    async fn set_ai_state_approval(
        &self,
        article_id: i64,
        state_id: i64,
        is_human_approved: bool,
    ) -> Result<()> {
        let mut data = self.data.lock();
        for ai in data
            .ai_states
            .iter_mut()
            .filter(|ai| ai.article_id == article_id && ai.state_id == Some(state_id))
        {
            ai.is_human_approved = is_human_approved;
        }
        Ok(())
    }

    async fn human_state_exists(&self, article_id: i64, state_id: i64) -> Result<bool> {
        let wanted = ArticleStateContract { article_id, state_id };
        Ok(self.data.lock().human_states.contains(&wanted))
    }

    async fn create_human_state(&self, article_id: i64, state_id: i64) -> Result<()> {
        self.data.lock().human_states.push(ArticleStateContract { article_id, state_id });
        Ok(())
    }

    async fn delete_human_state(&self, article_id: i64, state_id: i64) -> Result<()> {
        let unwanted = ArticleStateContract { article_id, state_id };
        self.data.lock().human_states.retain(|c| *c != unwanted);
        Ok(())
    }

    async fn article_detail_rows(&self, article_id: i64) -> Result<Vec<ArticleDetailRow>> {
        let data = self.data.lock();
        let Some(stored) = data.articles.iter().find(|a| a.id == article_id) else {
            return Ok(Vec::new());
        };

        let state_name =
            |id: i64| data.states.iter().find(|s| s.id == id).map(|s| s.name.clone());
        let content = data.contents.iter().find(|(id, _)| *id == article_id).map(|(_, c)| c.clone());
        let ai = data.ai_states.iter().find(|ai| ai.article_id == article_id);
        let humans: Vec<Option<i64>> = {
            let ids: Vec<_> = data
                .human_states
                .iter()
                .filter(|c| c.article_id == article_id)
                .map(|c| Some(c.state_id))
                .collect();
            if ids.is_empty() { vec![None] } else { ids }
        };

        Ok(humans
            .into_iter()
            .map(|human_state_id| ArticleDetailRow {
                article_id,
                title: Some(stored.article.title.clone()),
                description: Some(stored.article.description.clone()),
                url: Some(stored.article.url.clone()),
                article_content: content.clone(),
                human_state_id,
                human_state_name: human_state_id.and_then(state_name),
                ai_state_id: ai.and_then(|a| a.state_id),
                ai_state_name: ai.and_then(|a| a.state_id).and_then(state_name),
                ai_prompt_id: ai.and_then(|a| a.prompt_id),
                ai_is_human_approved: ai.map(|a| a.is_human_approved),
                ai_reasoning: ai.and_then(|a| a.reasoning.clone()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: i64, abbreviation: &str) -> State {
        State { id, name: format!("State {}", abbreviation), abbreviation: abbreviation.to_string() }
    }

    #[tokio::test]
    async fn test_delete_article_removes_attached_rows() {
        let repo = InMemoryNewsRepository::new();
        let kept = repo.seed_article("https://a.example/kept", "Kept");
        let gone = repo.seed_article("https://a.example/gone", "Gone");
        repo.seed_approval(gone, true);
        repo.with_data(|data| {
            data.states.push(state(1, "TX"));
            data.human_states.push(ArticleStateContract { article_id: gone, state_id: 1 });
            data.human_states.push(ArticleStateContract { article_id: kept, state_id: 1 });
            data.contents.push((gone, "body".to_string()));
            data.not_relevant.push(gone);
        });

        assert!(repo.delete_article(gone).await.unwrap());
        assert!(!repo.delete_article(gone).await.unwrap());

        let ids: Vec<_> =
            repo.list_articles(ArticleListFilter::default()).await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![kept]);
        assert!(repo.approved_articles().await.unwrap().is_empty());
        assert!(repo.not_relevant_article_ids().await.unwrap().is_empty());
        assert_eq!(repo.article_state_rows().await.unwrap().len(), 1);
        repo.with_data(|data| assert!(data.contents.is_empty()));
    }

    #[tokio::test]
    async fn test_list_articles_date_bounds_are_inclusive() {
        let repo = InMemoryNewsRepository::new();
        let id = repo.seed_article("https://a.example/1", "One");
        let published = repo.with_data(|data| data.articles[0].article.published_date);

        let filter = ArticleListFilter { published_on_or_after: published, created_on_or_after: None };
        assert_eq!(repo.list_articles(filter).await.unwrap()[0].id, id);

        let later = published.map(|p| p + Duration::seconds(1));
        let filter = ArticleListFilter { published_on_or_after: later, created_on_or_after: None };
        assert!(repo.list_articles(filter).await.unwrap().is_empty());
    }
}
