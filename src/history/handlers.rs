use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::dto::{AddSearchRequest, AddSearchResponse, HistoryQuery, HistoryResponse, MAX_LIMIT};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{AppJson, AppQuery},
    state::AppState,
};

/// Longest query the `search_history.query` column holds.
pub(crate) const MAX_QUERY_CHARS: usize = 500;

pub fn history_routes() -> Router<AppState> {
    Router::new().route(
        "/search-history",
        get(list_history).post(add_history).delete(clear_history),
    )
}

/// Trims the query and caps it to the column width; `None` when nothing is left.
pub(crate) fn normalize_query(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_QUERY_CHARS).collect())
}

#[instrument(skip_all, fields(user_id = %user.id, limit = q.limit))]
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(q): AppQuery<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let limit = q.limit.clamp(1, MAX_LIMIT);
    let history = state.db.get_search_history(user.id, limit).await?;
    Ok(Json(HistoryResponse { history }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(body): AppJson<AddSearchRequest>,
) -> AppResult<Json<AddSearchResponse>> {
    let query = body
        .query
        .as_deref()
        .and_then(normalize_query)
        .ok_or_else(|| AppError::Validation("query is required".into()))?;
    let history = state.db.add_search_history(user.id, &query).await?;
    Ok(Json(AddSearchResponse {
        success: true,
        history,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Value>> {
    state.db.clear_search_history(user.id).await?;
    Ok(Json(json!({ "success": true })))
}
