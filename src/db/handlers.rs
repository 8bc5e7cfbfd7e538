use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{error::AppResult, state::AppState};

#[derive(Debug, Serialize)]
pub struct InitDbResponse {
    pub success: bool,
    pub message: &'static str,
}

pub fn db_routes() -> Router<AppState> {
    Router::new().route("/init-db", post(init_db))
}

/// Creates the tables if they do not exist yet. Safe to call repeatedly.
#[instrument(skip_all)]
pub async fn init_db(State(state): State<AppState>) -> AppResult<Json<InitDbResponse>> {
    state.db.initialize_database().await?;
    info!("schema initialized on request");
    Ok(Json(InitDbResponse {
        success: true,
        message: "database initialized",
    }))
}
