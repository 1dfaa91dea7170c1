//! Article review listings and the weekly summary counters.

use crate::database::{
    NewsRepository, RepositoryError,
    models::{
        ArticleApproved, ArticleListFilter, ArticleReportContract, ArticleRow, ArticleStateRow,
        State,
    },
};
use crate::reports::parse_submitted_date;
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::America::New_York;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Filters accepted by the article review listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleListRequest {
    pub filter: ArticleListFilter,
    pub only_not_approved: bool,
    pub only_relevant: bool,
}

impl ArticleListRequest {
    pub fn from_json(body: &Value) -> Result<Self, String> {
        Ok(Self {
            filter: ArticleListFilter {
                published_on_or_after: date_field(body, "returnOnlyThisPublishedDateOrAfter")?,
                created_on_or_after: date_field(body, "returnOnlyThisCreatedAtDateOrAfter")?,
            },
            only_not_approved: flag(body, "returnOnlyIsNotApproved"),
            only_relevant: flag(body, "returnOnlyIsRelevant"),
        })
    }
}

/// Missing, null and empty dates are no bound. Timestamps keep their time
/// of day; bare dates start at midnight UTC.
fn date_field(body: &Value, key: &str) -> Result<Option<DateTime<Utc>>, String> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_submitted_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()))
            .map(Some)
            .ok_or_else(|| format!("{} must be a date (YYYY-MM-DD)", key)),
        Some(_) => Err(format!("{} must be a date (YYYY-MM-DD)", key)),
    }
}

fn flag(body: &Value, key: &str) -> bool {
    matches!(body.get(key), Some(Value::Bool(true)))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTerms {
    pub and_string: Option<String>,
    pub or_string: Option<String>,
    pub not_string: Option<String>,
}

impl RequestTerms {
    /// `AND a OR b NOT c`, leaving out the empty groups
    pub fn keyword(&self) -> String {
        let mut keyword = String::new();
        let groups = [("AND", &self.and_string), ("OR", &self.or_string), ("NOT", &self.not_string)];
        for (operator, terms) in groups {
            if let Some(terms) = terms.as_deref().filter(|t| !t.is_empty()) {
                if !keyword.is_empty() {
                    keyword.push(' ');
                }
                keyword.push_str(operator);
                keyword.push(' ');
                keyword.push_str(terms);
            }
        }
        keyword
    }
}

/// One row of the article review table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewArticle {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub url: Option<String>,
    #[serde(rename = "States")]
    pub states: Vec<State>,
    pub states_string_comma_separated: String,
    #[serde(rename = "ArticleIsRelevant")]
    pub article_is_relevant: bool,
    pub article_is_approved: bool,
    pub keyword: String,
    #[serde(rename = "NewsApiRequest")]
    pub news_api_request: RequestTerms,
}

fn states_by_article(rows: &[ArticleStateRow]) -> HashMap<i64, Vec<State>> {
    let mut states: HashMap<i64, Vec<State>> = HashMap::new();
    for row in rows {
        let entry = states.entry(row.article_id).or_default();
        if !entry.iter().any(|s| s.id == row.state_id) {
            entry.push(State {
                id: row.state_id,
                name: row.name.clone(),
                abbreviation: row.abbreviation.clone(),
            });
        }
    }
    states
}

fn abbreviations(states: &[State]) -> String {
    states.iter().map(|s| s.abbreviation.as_str()).collect::<Vec<_>>().join(", ")
}

/// Attach states, approval and relevance to each article, then apply the
/// approval and relevance filters.
pub fn review_articles(
    articles: Vec<ArticleRow>,
    state_rows: &[ArticleStateRow],
    approvals: &[ArticleApproved],
    not_relevant: &[i64],
    request: &ArticleListRequest,
) -> Vec<ReviewArticle> {
    let mut states = states_by_article(state_rows);
    let approved: HashSet<i64> =
        approvals.iter().filter(|a| a.is_approved).map(|a| a.article_id).collect();
    let not_relevant: HashSet<i64> = not_relevant.iter().copied().collect();

    articles
        .into_iter()
        .map(|article| {
            let states = states.remove(&article.id).unwrap_or_default();
            let terms = RequestTerms {
                and_string: article.and_string,
                or_string: article.or_string,
                not_string: article.not_string,
            };
            ReviewArticle {
                id: article.id,
                title: article.title,
                description: article.description,
                published_date: article.published_date,
                url: article.url,
                states_string_comma_separated: abbreviations(&states),
                states,
                article_is_relevant: !not_relevant.contains(&article.id),
                article_is_approved: approved.contains(&article.id),
                keyword: terms.keyword(),
                news_api_request: terms,
            }
        })
        .filter(|a| !request.only_not_approved || !a.article_is_approved)
        .filter(|a| !request.only_relevant || a.article_is_relevant)
        .collect()
}

pub async fn list_review_articles(
    repo: &dyn NewsRepository,
    request: ArticleListRequest,
) -> Result<Vec<ReviewArticle>, RepositoryError> {
    let articles = repo.list_articles(request.filter).await?;
    let received = articles.len();
    let state_rows = repo.article_state_rows().await?;
    let approvals = repo.approved_articles().await?;
    let not_relevant = repo.not_relevant_article_ids().await?;

    let listed = review_articles(articles, &state_rows, &approvals, &not_relevant, &request);
    info!("Listing {} of {} articles for review", listed.len(), received);
    Ok(listed)
}

/// Approved article with its report submissions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedArticle {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub publication_name: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub url_to_image: Option<String>,
    pub entity_who_found_article_id: Option<i64>,
    pub news_api_request_id: Option<i64>,
    #[serde(rename = "States")]
    pub states: Vec<State>,
    #[serde(rename = "ArticleApproveds")]
    pub article_approveds: Vec<ArticleApproved>,
    #[serde(rename = "ArticleReportContracts")]
    pub article_report_contracts: Vec<ArticleReportContract>,
    /// "Yes" once the article is part of any report
    pub is_submitted: &'static str,
    /// Vacuously true for articles that were never submitted
    pub article_has_been_accepted_by_all: bool,
    pub state_abbreviation: String,
}

pub fn approved_articles(
    articles: Vec<ArticleRow>,
    state_rows: &[ArticleStateRow],
    approvals: &[ArticleApproved],
    contracts: &[ArticleReportContract],
) -> Vec<ApprovedArticle> {
    let mut states = states_by_article(state_rows);
    let mut approvals_by_article: HashMap<i64, Vec<ArticleApproved>> = HashMap::new();
    for approval in approvals.iter().filter(|a| a.is_approved) {
        approvals_by_article.entry(approval.article_id).or_default().push(approval.clone());
    }
    let mut contracts_by_article: HashMap<i64, Vec<ArticleReportContract>> = HashMap::new();
    for contract in contracts {
        contracts_by_article.entry(contract.article_id).or_default().push(contract.clone());
    }

    articles
        .into_iter()
        .filter_map(|article| {
            let article_approveds = approvals_by_article.remove(&article.id)?;
            let article_report_contracts =
                contracts_by_article.remove(&article.id).unwrap_or_default();
            let states = states.remove(&article.id).unwrap_or_default();
            Some(ApprovedArticle {
                id: article.id,
                title: article.title,
                description: article.description,
                published_date: article.published_date,
                created_at: article.created_at,
                publication_name: article.publication_name,
                url: article.url,
                author: article.author,
                url_to_image: article.url_to_image,
                entity_who_found_article_id: article.entity_who_found_article_id,
                news_api_request_id: article.news_api_request_id,
                is_submitted: if article_report_contracts.is_empty() { "No" } else { "Yes" },
                article_has_been_accepted_by_all: article_report_contracts
                    .iter()
                    .all(|c| c.article_accepted_by_cpsc),
                state_abbreviation: abbreviations(&states),
                states,
                article_approveds,
                article_report_contracts,
            })
        })
        .collect()
}

pub async fn list_approved_articles(
    repo: &dyn NewsRepository,
) -> Result<Vec<ApprovedArticle>, RepositoryError> {
    let articles = repo.list_articles(ArticleListFilter::default()).await?;
    let state_rows = repo.article_state_rows().await?;
    let approvals = repo.approved_articles().await?;
    let contracts = repo.list_article_report_contracts().await?;
    Ok(approved_articles(articles, &state_rows, &approvals, &contracts))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub articles_count: usize,
    pub articles_since_last_thursday20h_est: usize,
    pub article_has_state_count: usize,
    pub article_is_approved_count: usize,
    /// Counts approval rows, so an article approved twice counts twice
    pub approved_but_not_in_report_count: usize,
}

/// The most recent Thursday 20:00 in New York at or before `now`; the
/// weekly report cycle closes then.
pub fn last_thursday_20h_new_york(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&New_York);
    let days_back = (local.weekday().num_days_from_monday() + 7
        - Weekday::Thu.num_days_from_monday())
        % 7;
    let thursday = local.date_naive() - Duration::days(days_back.into());

    let at_20h = |date: chrono::NaiveDate| {
        let naive = date.and_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default());
        New_York
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc())
    };

    let cutoff = at_20h(thursday);
    if cutoff > now { at_20h(thursday - Duration::days(7)) } else { cutoff }
}

pub fn summary_statistics(
    articles: &[ArticleRow],
    state_rows: &[ArticleStateRow],
    approvals: &[ArticleApproved],
    contracts: &[ArticleReportContract],
    cutoff: DateTime<Utc>,
) -> SummaryStatistics {
    let with_state: HashSet<i64> = state_rows.iter().map(|s| s.article_id).collect();
    let approvals: Vec<_> = approvals.iter().filter(|a| a.is_approved).collect();
    let approved: HashSet<i64> = approvals.iter().map(|a| a.article_id).collect();
    let in_report: HashSet<i64> = contracts.iter().map(|c| c.article_id).collect();

    SummaryStatistics {
        articles_count: articles.len(),
        articles_since_last_thursday20h_est: articles
            .iter()
            .filter(|a| a.created_at >= cutoff)
            .count(),
        article_has_state_count: with_state.len(),
        article_is_approved_count: approved.len(),
        approved_but_not_in_report_count: approvals
            .iter()
            .filter(|a| !in_report.contains(&a.article_id))
            .count(),
    }
}

pub async fn summarize(
    repo: &dyn NewsRepository,
    now: DateTime<Utc>,
) -> Result<SummaryStatistics, RepositoryError> {
    let articles = repo.list_articles(ArticleListFilter::default()).await?;
    let state_rows = repo.article_state_rows().await?;
    let approvals = repo.approved_articles().await?;
    let contracts = repo.list_article_report_contracts().await?;
    Ok(summary_statistics(
        &articles,
        &state_rows,
        &approvals,
        &contracts,
        last_thursday_20h_new_york(now),
    ))
}
