use super::{ApiError, ApiJson, ApiState};
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
    Router::new().route("/", get(list_states)).route("/:article_id", post(set_article_states))
}

async fn list_states(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let states = state.repo.list_states().await?;
    Ok(Json(json!({ "statesArray": states })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetStatesBody {
    #[serde(default)]
    state_id_array: Vec<i64>,
}

async fn set_article_states(
    State(state): State<ApiState>,
    Path(article_id): Path<i64>,
    ApiJson(body): ApiJson<SetStatesBody>,
) -> Result<Json<Value>, ApiError> {
    let mut state_ids = body.state_id_array;
    state_ids.sort_unstable();
    state_ids.dedup();

    let contracts = state.repo.replace_article_states(article_id, &state_ids).await?;
    info!("Article {} now has {} human-assigned states", article_id, contracts.len());

    Ok(Json(json!({ "result": true, "articleStateContracts": contracts })))
}
