use axum::{
    extract::{Path, State},
    http::header::CACHE_CONTROL,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{instrument, warn};

use super::dto::{
    GenreListResponse, HomeResponse, MovieDetailsResponse, MovieListResponse, PageQuery,
    ReviewsQuery, SearchQuery,
};
use crate::{
    auth::extractors::MaybeAuthUser,
    error::{AppError, AppResult},
    extract::AppQuery,
    favorites::handlers::parse_movie_id,
    history::handlers::normalize_query,
    state::AppState,
    tmdb::{client::CACHE_MAX_AGE_SECS, status::classify_release},
};

pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/reviews", get(reviews))
        .route("/movies/now-playing", get(now_playing))
        .route("/movies/popular", get(popular))
        .route("/movies/upcoming", get(upcoming))
        .route("/movies/home", get(home))
        .route("/movies/:id", get(movie_details))
        .route("/movies/:id/videos", get(movie_videos))
        .route("/genres", get(genres))
        .route("/genres/:id", get(movies_by_genre))
}

fn cached<T: IntoResponse>(body: T) -> impl IntoResponse {
    (
        [(CACHE_CONTROL, format!("public, max-age={CACHE_MAX_AGE_SECS}"))],
        body,
    )
}

/// Searches TMDB. A signed-in caller also gets the query recorded in their
/// history; a failed record never fails the search.
#[instrument(skip_all)]
pub async fn search(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    AppQuery(q): AppQuery<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let query = q
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("query parameter q is required".into()))?;

    let results = state.tmdb.search(query).await?;

    // History keeps a copy capped to its column width; TMDB saw the full query.
    if let (Some(user), Some(recorded)) = (user, normalize_query(query)) {
        if let Err(e) = state.db.add_search_history(user.id, &recorded).await {
            warn!(user_id = %user.id, error = %e, "could not record search");
        }
    }
    Ok(cached(Json(MovieListResponse { results })))
}

#[instrument(skip_all)]
pub async fn reviews(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<ReviewsQuery>,
) -> AppResult<impl IntoResponse> {
    let movie_id = parse_movie_id(q.movie_id.as_deref())?;
    let page = q.page.unwrap_or(1).max(1);
    let body = state.tmdb.reviews(i64::from(movie_id), page).await?;
    Ok(cached(Json(body)))
}

#[instrument(skip_all)]
pub async fn now_playing(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let results = state.tmdb.now_playing().await?;
    Ok(cached(Json(MovieListResponse { results })))
}

#[instrument(skip_all)]
pub async fn popular(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let results = state.tmdb.popular().await?;
    Ok(cached(Json(MovieListResponse { results })))
}

#[instrument(skip_all)]
pub async fn upcoming(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let results = state.tmdb.upcoming().await?;
    Ok(cached(Json(MovieListResponse { results })))
}

/// The three home-page rails, fetched concurrently. Any failure fails the page.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let (now_playing, popular, upcoming) = tokio::try_join!(
        state.tmdb.now_playing(),
        state.tmdb.popular(),
        state.tmdb.upcoming()
    )?;
    Ok(cached(Json(HomeResponse {
        now_playing,
        popular,
        upcoming,
    })))
}

#[instrument(skip(state))]
pub async fn movie_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_movie_id(Some(&id))?;
    let details = state.tmdb.details(i64::from(id)).await?;

    let today = OffsetDateTime::now_utc().date();
    let release_status = classify_release(details.movie.release_date.as_deref(), today);
    let poster_url = state.tmdb.poster_url(details.movie.poster_path.as_deref());
    let backdrop_url = state.tmdb.backdrop_url(details.movie.backdrop_path.as_deref());

    Ok(cached(Json(MovieDetailsResponse {
        details,
        release_status,
        release_status_label: release_status.label(),
        poster_url,
        backdrop_url,
    })))
}

#[instrument(skip(state))]
pub async fn movie_videos(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_movie_id(Some(&id))?;
    let body = state.tmdb.videos(i64::from(id)).await?;
    Ok(cached(Json(body)))
}

#[instrument(skip_all)]
pub async fn genres(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let genres = state.tmdb.genres().await?;
    Ok(cached(Json(GenreListResponse { genres })))
}

#[instrument(skip(state))]
pub async fn movies_by_genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppQuery(q): AppQuery<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let genre_id = id
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|g| *g > 0)
        .ok_or_else(|| AppError::Validation("invalid genre id".into()))?;
    let body = state.tmdb.discover_by_genre(genre_id, q.page()).await?;
    Ok(cached(Json(body)))
}
