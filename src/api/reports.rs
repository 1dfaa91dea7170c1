use super::{ApiError, ApiJson, ApiState};
use crate::reports::{
    group_reports_by_cr_name, group_reports_table, parse_submitted_date, toggle_rejection,
};
use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/", get(reports_by_cr_name))
        .route("/table", get(reports_table))
        .route("/update-submitted-to-client-date/:report_id", post(update_submitted_date))
        .route("/toggle-article-rejection/:id", post(toggle_article_rejection))
}

async fn reports_by_cr_name(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let reports = state.repo.list_reports().await?;
    Ok(Json(json!({ "reportsArrayByCrName": group_reports_by_cr_name(reports) })))
}

async fn reports_table(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let reports = state.repo.list_reports().await?;
    Ok(Json(json!({ "reportsArray": group_reports_table(reports) })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmittedDateBody {
    date_submitted_to_client: Option<String>,
}

async fn update_submitted_date(
    State(state): State<ApiState>,
    Path(report_id): Path<i64>,
    ApiJson(body): ApiJson<SubmittedDateBody>,
) -> Result<Json<Value>, ApiError> {
    let date = body
        .date_submitted_to_client
        .as_deref()
        .and_then(parse_submitted_date)
        .ok_or_else(|| {
            ApiError::Validation("dateSubmittedToClient must be a YYYY-MM-DD date".to_string())
        })?;

    let report = state
        .repo
        .update_report_submitted_date(report_id, date)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Report {} not found", report_id)))?;

    info!("Report {} submitted to client on {}", report_id, date);
    Ok(Json(json!({ "result": true, "report": report })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectionBody {
    article_rejection_reason: Option<String>,
}

async fn toggle_article_rejection(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<RejectionBody>,
) -> Result<Json<Value>, ApiError> {
    let contract = state.repo.find_article_report_contract(id).await?.ok_or_else(|| {
        ApiError::NotFound(format!("Article report contract {} not found", id))
    })?;

    let toggled = toggle_rejection(contract, body.article_rejection_reason);
    state.repo.save_article_report_contract(&toggled).await?;

    info!("Article report contract {} accepted: {}", id, toggled.article_accepted_by_cpsc);
    Ok(Json(json!({ "result": true, "articleReportContract": toggled })))
}
