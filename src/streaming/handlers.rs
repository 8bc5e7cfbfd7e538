use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{FallbackQuery, FallbackResponse, StreamingQuery, StreamingResponse},
    fallback::fallback_links,
    providers::LinkQuery,
};
use crate::{
    error::{AppError, AppResult},
    extract::AppQuery,
    state::AppState,
};

pub fn streaming_routes() -> Router<AppState> {
    Router::new()
        .route("/streaming", get(streaming_links))
        .route("/streaming/fallback", get(fallback_search))
}

fn required_title(raw: Option<&str>) -> AppResult<String> {
    raw.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("title parameter is required".into()))
}

/// Accepts "1999" as well as a full "1999-10-15" release date.
fn parse_year(raw: Option<&str>) -> Option<i32> {
    raw?.trim().split('-').next()?.parse().ok()
}

/// Provider failures only ever show up as `success: false`.
#[instrument(skip_all)]
pub async fn streaming_links(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<StreamingQuery>,
) -> AppResult<Json<StreamingResponse>> {
    let title = required_title(q.title.as_deref())?;
    let tmdb_id = q
        .tmdb_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok())
        .filter(|id| *id > 0);

    let links = state.streaming.resolve(&LinkQuery { title, tmdb_id }).await;
    Ok(Json(StreamingResponse {
        success: links.is_some(),
        links,
    }))
}

#[instrument(skip_all)]
pub async fn fallback_search(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<FallbackQuery>,
) -> AppResult<Json<FallbackResponse>> {
    let title = required_title(q.title.as_deref())?;
    let links = fallback_links(&title, parse_year(q.year.as_deref()), &state.title_rules);
    Ok(Json(FallbackResponse { links }))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::{
        app::testing::send,
        streaming::{
            aggregator::StreamingAggregator, dto::StreamingLink, providers::LinkProvider,
        },
    };

    /// Echoes the query back as a single link.
    struct EchoProvider;

    #[async_trait]
    impl LinkProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn lookup(&self, query: &LinkQuery) -> anyhow::Result<Vec<StreamingLink>> {
            Ok(vec![StreamingLink::new(
                query.title.clone(),
                format!("https://echo/{:?}", query.tmdb_id),
                "pelisplus",
            )])
        }
    }

    #[test]
    fn year_parsing() {
        assert_eq!(parse_year(Some("1999")), Some(1999));
        assert_eq!(parse_year(Some("1999-10-15")), Some(1999));
        assert_eq!(parse_year(Some("")), None);
        assert_eq!(parse_year(Some("n/a")), None);
        assert_eq!(parse_year(None), None);
    }

    #[tokio::test]
    async fn missing_title_is_the_only_client_error() {
        let state = AppState::fake();
        let (status, body) = send(&state, Method::GET, "/api/streaming", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = send(&state, Method::GET, "/api/streaming?title=%20", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn no_links_is_a_successful_response() {
        let state = AppState::fake();
        let (status, body) =
            send(&state, Method::GET, "/api/streaming?title=Matrix&tmdbId=603", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": false, "links": null }));
    }

    #[tokio::test]
    async fn provider_links_are_returned_and_bad_ids_ignored() {
        let mut state = AppState::fake();
        state.streaming = Arc::new(StreamingAggregator::new(
            vec![Arc::new(EchoProvider)],
            Duration::from_millis(50),
        ));

        let (status, body) =
            send(&state, Method::GET, "/api/streaming?title=Matrix&tmdbId=603", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["links"][0]["name"], "Matrix");
        assert_eq!(body["links"][0]["url"], "https://echo/Some(603)");

        let (_, body) =
            send(&state, Method::GET, "/api/streaming?title=Matrix&tmdbId=abc", None, None).await;
        assert_eq!(body["links"][0]["url"], "https://echo/None");
    }

    #[tokio::test]
    async fn fallback_lists_search_sites() {
        let state = AppState::fake();
        let (status, _) = send(&state, Method::GET, "/api/streaming/fallback", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            Method::GET,
            "/api/streaming/fallback?title=Toy%20Story%204&year=2019-06-21",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let links = body["links"].as_array().unwrap();
        assert_eq!(links.len(), 6);
        assert_eq!(links[4]["url"], "https://la.movie/peliculas/toy-story-4-2019");
    }
}
