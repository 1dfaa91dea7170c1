//! Review of AI-assigned US states.
//!
//! Lists articles with their AI state assignment plus the scores two
//! categorizers gave them, and lets a reviewer approve or reject an
//! assignment. Approval mirrors the state into the human-curated
//! article/state table.

use crate::database::{
    NewsRepository, RepositoryError,
    models::{AiScore, ArticleDetailRow, StateAssignmentFilter, StateAssignmentRow},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, info, warn};

pub const SEMANTIC_SCORER_NAME: &str = "NewsNexusSemanticScorer02";
pub const LOCATION_CLASSIFIER_NAME: &str = "NewsNexusClassifierLocationScorer01";

/// Longest publication cutoff applied; older cutoffs precede any storable
/// timestamp and filter nothing.
pub const MAX_THRESHOLD_DAYS: u32 = 1_000_000;

/// Validated body of a state-assignment listing request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListRequest {
    pub include_null_state: bool,
    pub threshold_days_old: Option<f64>,
}

impl ListRequest {
    pub fn from_json(body: &Value) -> Result<Self, String> {
        let include_null_state = match body.get("includeNullState") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err("includeNullState must be a boolean value if provided".into()),
        };

        let threshold_days_old = match body.get("targetArticleThresholdDaysOld") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => {
                let days = n.as_f64().ok_or("targetArticleThresholdDaysOld must be a valid number if provided")?;
                if days < 0.0 {
                    return Err("targetArticleThresholdDaysOld must be a non-negative number".into());
                }
                Some(days)
            },
            Some(_) => {
                return Err("targetArticleThresholdDaysOld must be a valid number if provided".into());
            },
        };

        Ok(Self { include_null_state, threshold_days_old })
    }

    fn filter(&self) -> StateAssignmentFilter {
        StateAssignmentFilter {
            include_null_state: self.include_null_state,
            published_within_days: self
                .threshold_days_old
                .map(f64::ceil)
                .filter(|days| *days <= f64::from(MAX_THRESHOLD_DAYS))
                .map(|days| days as u32),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAssignment {
    pub prompt_id: Option<i64>,
    pub is_human_approved: Option<bool>,
    pub is_determined_to_be_error: Option<bool>,
    #[serde(rename = "occuredInTheUS")]
    pub occured_in_the_us: Option<bool>,
    pub reasoning: Option<String>,
    pub state_id: Option<i64>,
    pub state_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAssignedArticle {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub published_date: Option<DateTime<Utc>>,
    pub semantic_rating_max: Option<f64>,
    pub semantic_rating_max_label: Option<String>,
    pub location_classifier_score: Option<f64>,
    pub location_classifier_score_label: Option<String>,
    pub state_assignment: StateAssignment,
}

impl From<StateAssignmentRow> for StateAssignedArticle {
    fn from(row: StateAssignmentRow) -> Self {
        Self {
            id: row.article_id,
            title: row.title,
            description: row.description,
            url: row.url,
            created_at: row.created_at,
            published_date: row.published_date,
            semantic_rating_max: None,
            semantic_rating_max_label: None,
            location_classifier_score: None,
            location_classifier_score_label: None,
            state_assignment: StateAssignment {
                prompt_id: row.prompt_id,
                is_human_approved: row.is_human_approved,
                is_determined_to_be_error: row.is_determined_to_be_error,
                occured_in_the_us: row.occured_in_the_us,
                reasoning: row.reasoning,
                state_id: row.state_id,
                state_name: row.state_name,
            },
        }
    }
}

/// Best score per article; scores arrive highest rating first.
fn best_scores(scores: Vec<AiScore>) -> HashMap<i64, AiScore> {
    let mut best = HashMap::new();
    for score in scores {
        best.entry(score.article_id).or_insert(score);
    }
    best
}

async fn scores_for(
    repo: &dyn NewsRepository,
    ai_name: &str,
    article_ids: &[i64],
) -> Option<HashMap<i64, AiScore>> {
    match repo.ai_scores(ai_name, article_ids).await {
        Ok(Some(scores)) => Some(best_scores(scores)),
        Ok(None) => {
            warn!("{} AI entity not found or has no categorizer entity", ai_name);
            None
        },
        Err(e) => {
            error!("Error fetching {} scores, returning articles without them: {}", ai_name, e);
            None
        },
    }
}

pub async fn list_state_assignments(
    repo: &dyn NewsRepository,
    request: ListRequest,
) -> Result<Vec<StateAssignedArticle>, RepositoryError> {
    info!(
        "Listing state assignments - includeNullState: {}, targetArticleThresholdDaysOld: {:?}",
        request.include_null_state, request.threshold_days_old
    );

    let rows = repo.articles_with_state_assignments(request.filter()).await?;
    let mut articles: Vec<StateAssignedArticle> = rows.into_iter().map(Into::into).collect();
    if articles.is_empty() {
        return Ok(articles);
    }

    let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();

    if let Some(scores) = scores_for(repo, SEMANTIC_SCORER_NAME, &ids).await {
        for article in &mut articles {
            if let Some(score) = scores.get(&article.id) {
                article.semantic_rating_max = score.keyword_rating;
                article.semantic_rating_max_label = score.keyword.clone();
            }
        }
    }

    if let Some(scores) = scores_for(repo, LOCATION_CLASSIFIER_NAME, &ids).await {
        for article in &mut articles {
            if let Some(score) = scores.get(&article.id) {
                article.location_classifier_score = score.keyword_rating;
                article.location_classifier_score_label = score.keyword.clone();
            }
        }
    }

    info!("Retrieved {} articles with state assignments", articles.len());
    Ok(articles)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanVerifyAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanVerifyRequest {
    pub action: HumanVerifyAction,
    pub state_id: i64,
}

impl HumanVerifyRequest {
    pub fn from_json(body: &Value) -> Result<Self, String> {
        let action = match body.get("action") {
            None | Some(Value::Null) => return Err("action field is required".into()),
            Some(Value::String(s)) if s.is_empty() => return Err("action field is required".into()),
            Some(Value::String(s)) if s == "approve" => HumanVerifyAction::Approve,
            Some(Value::String(s)) if s == "reject" => HumanVerifyAction::Reject,
            Some(_) => return Err(r#"action must be either "approve" or "reject""#.into()),
        };

        let state_id = match body.get("stateId") {
            None | Some(Value::Null) => return Err("stateId field is required".into()),
            Some(Value::Number(n)) => n.as_i64().ok_or("stateId must be a valid number")?,
            Some(_) => return Err("stateId must be a valid number".into()),
        };

        Ok(Self { action, state_id })
    }
}

#[derive(Debug, Error)]
pub enum HumanVerifyError {
    #[error("AI state assignment not found for article {article_id} with state {state_id}")]
    AssignmentNotFound { article_id: i64, state_id: i64 },

    #[error("Article {article_id} already has human-approved state {state_id}")]
    AlreadyApproved { article_id: i64, state_id: i64 },

    #[error("No article exists with ID {0}")]
    ArticleNotFound(i64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateRef {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAiApproved {
    pub prompt_id: Option<i64>,
    pub is_human_approved: Option<bool>,
    pub reasoning: Option<String>,
    pub state: StateRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetails {
    pub article_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub state_human_approved_array: Vec<StateRef>,
    pub state_ai_approved: Option<StateAiApproved>,
}

/// Fold the joined detail rows of one article; `None` when there are none.
pub fn format_article_details(rows: &[ArticleDetailRow]) -> Option<ArticleDetails> {
    let first = rows.first()?;

    let mut human_states: Vec<StateRef> = Vec::new();
    for row in rows {
        if let Some(id) = row.human_state_id {
            if !human_states.iter().any(|s| s.id == id) {
                human_states.push(StateRef { id, name: row.human_state_name.clone() });
            }
        }
    }

    let state_ai_approved = first.ai_state_id.map(|id| StateAiApproved {
        prompt_id: first.ai_prompt_id,
        is_human_approved: first.ai_is_human_approved,
        reasoning: first.ai_reasoning.clone(),
        state: StateRef { id, name: first.ai_state_name.clone() },
    });

    Some(ArticleDetails {
        article_id: first.article_id,
        title: first.title.clone(),
        description: first.description.clone(),
        url: first.url.clone(),
        content: first.article_content.clone().filter(|c| !c.is_empty()),
        state_human_approved_array: human_states,
        state_ai_approved,
    })
}

/// Apply a reviewer's decision and return the article's refreshed state view.
pub async fn human_verify(
    repo: &dyn NewsRepository,
    article_id: i64,
    request: HumanVerifyRequest,
) -> Result<ArticleDetails, HumanVerifyError> {
    let state_id = request.state_id;
    if !repo.ai_state_assignment_exists(article_id, state_id).await? {
        return Err(HumanVerifyError::AssignmentNotFound { article_id, state_id });
    }

    match request.action {
        HumanVerifyAction::Approve => {
            repo.set_ai_state_approval(article_id, state_id, true).await?;
            if repo.human_state_exists(article_id, state_id).await? {
                return Err(HumanVerifyError::AlreadyApproved { article_id, state_id });
            }
            repo.create_human_state(article_id, state_id).await?;
            info!("Article {} state {} approved by human", article_id, state_id);
        },
        HumanVerifyAction::Reject => {
            repo.set_ai_state_approval(article_id, state_id, false).await?;
            repo.delete_human_state(article_id, state_id).await?;
            info!("Article {} state {} rejected by human", article_id, state_id);
        },
    }

    let rows = repo.article_detail_rows(article_id).await?;
    format_article_details(&rows).ok_or(HumanVerifyError::ArticleNotFound(article_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        InMemoryNewsRepository,
        memory::AiStateAssignment,
        models::State,
    };
    use serde_json::json;

    fn seeded_repo() -> (InMemoryNewsRepository, i64) {
        let repo = InMemoryNewsRepository::new();
        let article_id = repo.seed_article("https://example.com/a", "Space heater fire");
        repo.with_data(|data| {
            data.states.push(State { id: 6, name: "Colorado".into(), abbreviation: "CO".into() });
            data.ai_states.push(AiStateAssignment {
                article_id,
                state_id: Some(6),
                prompt_id: Some(3),
                reasoning: Some("Denver is mentioned".into()),
                ..Default::default()
            });
        });
        (repo, article_id)
    }

    #[test]
    fn test_list_request_validation() {
        assert_eq!(ListRequest::from_json(&json!({})).unwrap(), ListRequest::default());

        let parsed =
            ListRequest::from_json(&json!({"includeNullState": true, "targetArticleThresholdDaysOld": 30}))
                .unwrap();
        assert!(parsed.include_null_state);
        assert_eq!(parsed.threshold_days_old, Some(30.0));

        assert_eq!(
            ListRequest::from_json(&json!({"targetArticleThresholdDaysOld": -1})).unwrap_err(),
            "targetArticleThresholdDaysOld must be a non-negative number"
        );
        assert!(ListRequest::from_json(&json!({"targetArticleThresholdDaysOld": "7"})).is_err());
        assert!(ListRequest::from_json(&json!({"includeNullState": "yes"})).is_err());
    }

    #[test]
    fn test_threshold_rounds_up_and_drops_unreachable_cutoffs() {
        let filter = |days: f64| {
            ListRequest { include_null_state: false, threshold_days_old: Some(days) }
                .filter()
                .published_within_days
        };
        assert_eq!(filter(0.0), Some(0));
        assert_eq!(filter(2.1), Some(3));
        assert_eq!(filter(f64::from(MAX_THRESHOLD_DAYS)), Some(MAX_THRESHOLD_DAYS));
        assert_eq!(filter(1e12), None);
    }

    #[tokio::test]
    async fn test_huge_threshold_lists_every_article() {
        let (repo, article_id) = seeded_repo();
        let request =
            ListRequest::from_json(&json!({"targetArticleThresholdDaysOld": 1e12})).unwrap();

        let articles = list_state_assignments(&repo, request).await.unwrap();
        assert_eq!(articles.iter().map(|a| a.id).collect::<Vec<_>>(), [article_id]);
    }

    #[test]
    fn test_human_verify_request_validation() {
        let parsed = HumanVerifyRequest::from_json(&json!({"action": "approve", "stateId": 6})).unwrap();
        assert_eq!(parsed.action, HumanVerifyAction::Approve);
        assert_eq!(parsed.state_id, 6);

        assert_eq!(
            HumanVerifyRequest::from_json(&json!({"stateId": 6})).unwrap_err(),
            "action field is required"
        );
        assert!(HumanVerifyRequest::from_json(&json!({"action": "maybe", "stateId": 6})).is_err());
        assert_eq!(
            HumanVerifyRequest::from_json(&json!({"action": "reject"})).unwrap_err(),
            "stateId field is required"
        );
    }

    #[tokio::test]
    async fn test_list_attaches_best_scores() {
        let (repo, article_id) = seeded_repo();
        repo.with_data(|data| {
            data.ai_scores.insert(
                SEMANTIC_SCORER_NAME.to_string(),
                vec![
                    AiScore { article_id, keyword: Some("fire".into()), keyword_rating: Some(0.91) },
                    AiScore { article_id, keyword: Some("burn".into()), keyword_rating: Some(0.4) },
                ],
            );
        });

        let articles = list_state_assignments(&repo, ListRequest::default()).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].semantic_rating_max, Some(0.91));
        assert_eq!(articles[0].semantic_rating_max_label.as_deref(), Some("fire"));
        assert_eq!(articles[0].location_classifier_score, None);
        assert_eq!(articles[0].state_assignment.state_name.as_deref(), Some("Colorado"));

        let nulls = list_state_assignments(
            &repo,
            ListRequest { include_null_state: true, threshold_days_old: None },
        )
        .await
        .unwrap();
        assert!(nulls.is_empty());
    }

    #[tokio::test]
    async fn test_approve_then_reject() {
        let (repo, article_id) = seeded_repo();
        let approve = HumanVerifyRequest { action: HumanVerifyAction::Approve, state_id: 6 };

        let details = human_verify(&repo, article_id, approve).await.unwrap();
        assert_eq!(details.state_human_approved_array, vec![StateRef { id: 6, name: Some("Colorado".into()) }]);
        assert_eq!(details.state_ai_approved.as_ref().unwrap().is_human_approved, Some(true));

        let again = human_verify(&repo, article_id, approve).await.unwrap_err();
        assert!(matches!(again, HumanVerifyError::AlreadyApproved { .. }));

        let reject = HumanVerifyRequest { action: HumanVerifyAction::Reject, state_id: 6 };
        let details = human_verify(&repo, article_id, reject).await.unwrap();
        assert!(details.state_human_approved_array.is_empty());
        assert_eq!(details.state_ai_approved.unwrap().is_human_approved, Some(false));
    }

    #[tokio::test]
    async fn test_verify_unknown_assignment() {
        let (repo, article_id) = seeded_repo();
        let request = HumanVerifyRequest { action: HumanVerifyAction::Approve, state_id: 99 };
        let err = human_verify(&repo, article_id, request).await.unwrap_err();
        assert!(matches!(err, HumanVerifyError::AssignmentNotFound { state_id: 99, .. }));
    }

    #[test]
    fn test_format_article_details_dedupes_human_states() {
        let row = |human: Option<i64>| ArticleDetailRow {
            article_id: 1,
            title: Some("t".into()),
            description: None,
            url: None,
            article_content: Some(String::new()),
            human_state_id: human,
            human_state_name: human.map(|id| format!("S{}", id)),
            ai_state_id: None,
            ai_state_name: None,
            ai_prompt_id: None,
            ai_is_human_approved: None,
            ai_reasoning: None,
        };

        let details = format_article_details(&[row(Some(2)), row(Some(2)), row(Some(4))]).unwrap();
        let ids: Vec<_> = details.state_human_approved_array.iter().map(|s| s.id).collect();
        assert_eq!(ids, [2, 4]);
        assert!(details.state_ai_approved.is_none());
        assert!(details.content.is_none());
        assert!(format_article_details(&[]).is_none());
    }
}
