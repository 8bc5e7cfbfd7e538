use serde::{Deserialize, Serialize};

use crate::history::repo_types::SearchHistoryEntry;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 { DEFAULT_LIMIT }

#[derive(Debug, Deserialize)]
pub struct AddSearchRequest {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<SearchHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct AddSearchResponse {
    pub success: bool,
    pub history: SearchHistoryEntry,
}
