use reqwest::{header::CACHE_CONTROL, Client as HttpClient, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    config::TmdbConfig,
    error::{AppError, AppResult},
    tmdb::types::{
        Genre, GenresResponse, Movie, MovieDetails, MoviesResponse, ReviewsResponse,
        VideosResponse,
    },
};

const LANGUAGE: &str = "es-MX";
const REGION: &str = "MX";
/// Upstream responses may be reused for up to an hour.
pub const CACHE_MAX_AGE_SECS: u64 = 3600;

const POSTER_SIZE: &str = "w500";
const BACKDROP_SIZE: &str = "w1280";
const PLACEHOLDER_IMAGE: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' width='500' height='750'%3E%3Crect width='500' height='750' fill='%232d2d2d'/%3E%3Ctext x='50%25' y='50%25' font-family='Arial' font-size='24' fill='%23888888' text-anchor='middle' dy='.3em'%3ESin Imagen%3C/text%3E%3C/svg%3E";

/// Thin client over TMDB v3. Every call is a single GET with the API key,
/// locale and region appended.
#[derive(Clone)]
pub struct TmdbClient {
    http: HttpClient,
    api_key: Option<String>,
    base_url: String,
    image_base_url: String,
}

impl TmdbClient {
    pub fn new(http: HttpClient, cfg: &TmdbConfig) -> Self {
        Self {
            http,
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            image_base_url: cfg.image_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn build_url(
        &self,
        api_key: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<Url> {
        let mut all_params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all_params.push(("api_key", api_key));
        all_params.push(("language", LANGUAGE));
        all_params.push(("region", REGION));

        Url::parse_with_params(&format!("{}{}", self.base_url, path), &all_params)
            .map_err(|e| AppError::Config(format!("TMDB_BASE_URL is not a valid URL: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("TMDB_API_KEY is not set".into()))?;
        let url = self.build_url(api_key, path, params)?;
        // The URL carries the key; log the path only.
        debug!(path, "TMDB request");

        let response = self
            .http
            .get(url)
            .header(CACHE_CONTROL, format!("max-age={CACHE_MAX_AGE_SECS}"))
            .send()
            .await
            .map_err(|e| AppError::RemoteApi {
                status: 502,
                message: format!("TMDB unreachable: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::RemoteApi {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("error").to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| AppError::RemoteApi {
            status: 502,
            message: format!("invalid TMDB payload: {e}"),
        })
    }

    #[instrument(skip(self))]
    pub async fn now_playing(&self) -> AppResult<Vec<Movie>> {
        let page: MoviesResponse = self.get_json("/movie/now_playing", &[]).await?;
        Ok(page.results)
    }

    #[instrument(skip(self))]
    pub async fn popular(&self) -> AppResult<Vec<Movie>> {
        let page: MoviesResponse = self.get_json("/movie/popular", &[]).await?;
        Ok(page.results)
    }

    #[instrument(skip(self))]
    pub async fn upcoming(&self) -> AppResult<Vec<Movie>> {
        let page: MoviesResponse = self.get_json("/movie/upcoming", &[]).await?;
        Ok(page.results)
    }

    #[instrument(skip(self))]
    pub async fn details(&self, id: i64) -> AppResult<MovieDetails> {
        self.get_json(&format!("/movie/{id}"), &[]).await
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let page: MoviesResponse = self
            .get_json("/search/movie", &[("query", query.to_string())])
            .await?;
        Ok(page.results)
    }

    #[instrument(skip(self))]
    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        let body: GenresResponse = self.get_json("/genre/movie/list", &[]).await?;
        Ok(body.genres)
    }

    #[instrument(skip(self))]
    pub async fn discover_by_genre(&self, genre_id: i64, page: u32) -> AppResult<MoviesResponse> {
        self.get_json(
            "/discover/movie",
            &[
                ("with_genres", genre_id.to_string()),
                ("sort_by", "popularity.desc".to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn videos(&self, id: i64) -> AppResult<VideosResponse> {
        self.get_json(&format!("/movie/{id}/videos"), &[]).await
    }

    #[instrument(skip(self))]
    pub async fn reviews(&self, id: i64, page: u32) -> AppResult<ReviewsResponse> {
        self.get_json(&format!("/movie/{id}/reviews"), &[("page", page.to_string())])
            .await
    }

    pub fn poster_url(&self, path: Option<&str>) -> String {
        image_url(&self.image_base_url, path, POSTER_SIZE)
    }

    pub fn backdrop_url(&self, path: Option<&str>) -> String {
        image_url(&self.image_base_url, path, BACKDROP_SIZE)
    }
}

/// Full image URL for a TMDB path, or an inline placeholder when there is none.
pub fn image_url(base: &str, path: Option<&str>, size: &str) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(path) => format!("{base}/{size}{path}"),
        None => PLACEHOLDER_IMAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    use super::*;
    use crate::app::testing::spawn_upstream;

    fn client(base_url: &str, api_key: Option<&str>) -> TmdbClient {
        TmdbClient::new(
            HttpClient::new(),
            &TmdbConfig {
                api_key: api_key.map(str::to_string),
                base_url: base_url.to_string(),
                image_base_url: "https://image.tmdb.org/t/p".to_string(),
            },
        )
    }

    fn has_fixed_params(q: &HashMap<String, String>) -> bool {
        q.get("api_key").map(String::as_str) == Some("k")
            && q.get("language").map(String::as_str) == Some("es-MX")
            && q.get("region").map(String::as_str) == Some("MX")
    }

    async fn fake_tmdb() -> String {
        let router = Router::new()
            .route(
                "/3/search/movie",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    if !has_fixed_params(&q) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({
                        "page": 1,
                        "results": [{
                            "id": 603,
                            "title": q.get("query").cloned().unwrap_or_default(),
                            "overview": "",
                            "poster_path": null,
                            "backdrop_path": null,
                            "release_date": "1999-03-31",
                            "vote_average": 8.2,
                            "vote_count": 25000,
                            "popularity": 80.0
                        }],
                        "total_pages": 1,
                        "total_results": 1
                    })))
                }),
            )
            .route(
                "/3/movie/:id/reviews",
                get(|Path(id): Path<i64>, Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "id": id,
                        "page": q.get("page").and_then(|p| p.parse::<i64>().ok()).unwrap_or(0),
                        "results": [],
                        "total_pages": 0,
                        "total_results": 0
                    }))
                }),
            )
            .route("/3/movie/:id", get(|| async { StatusCode::NOT_FOUND }));
        format!("{}/3", spawn_upstream(router).await)
    }

    #[test]
    fn build_url_appends_key_locale_and_region() {
        let c = client("https://api.themoviedb.org/3/", Some("k"));
        let url = c
            .build_url("k", "/search/movie", &[("query", "el conjuro".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/3/search/movie");
        let q: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert!(has_fixed_params(&q));
        assert_eq!(q["query"], "el conjuro");
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        // Port 9 is never contacted: the key check comes first.
        let c = client("http://127.0.0.1:9/3", None);
        assert!(matches!(c.popular().await, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn search_decodes_results() {
        let c = client(&fake_tmdb().await, Some("k"));
        let results = c.search("Matrix").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 603);
        assert_eq!(results[0].title, "Matrix");
    }

    #[tokio::test]
    async fn reviews_pass_the_page() {
        let c = client(&fake_tmdb().await, Some("k"));
        let page = c.reviews(550, 3).await.unwrap();
        assert_eq!(page.id, 550);
        assert_eq!(page.page, 3);
    }

    #[tokio::test]
    async fn non_success_status_is_a_remote_error_with_status() {
        let c = client(&fake_tmdb().await, Some("k"));
        match c.details(1).await {
            Err(AppError::RemoteApi { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected RemoteApi, got {other:?}"),
        }
    }

    #[test]
    fn image_urls() {
        let c = client("https://api.themoviedb.org/3", Some("k"));
        assert_eq!(
            c.poster_url(Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(
            c.backdrop_url(Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/w1280/abc.jpg"
        );
        assert!(c.poster_url(None).starts_with("data:image/svg+xml"));
        assert!(c.backdrop_url(Some("")).starts_with("data:image/svg+xml"));
    }
}
