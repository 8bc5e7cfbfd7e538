//! Watch links: best-effort lookups on unofficial indexes, plus fixed search
//! links the client can always fall back to.

pub mod aggregator;
pub mod dto;
pub mod fallback;
pub mod handlers;
pub mod providers;

use crate::state::AppState;
use axum::Router;

pub use aggregator::StreamingAggregator;
pub use fallback::TitleRules;

pub fn router() -> Router<AppState> {
    handlers::streaming_routes()
}
