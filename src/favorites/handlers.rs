use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::dto::{
    AddFavoriteRequest, AddFavoriteResponse, CheckFavoriteResponse, FavoritesResponse,
    MovieIdQuery,
};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::{AppError, AppResult},
    extract::{AppJson, AppQuery},
    state::AppState,
};

pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/favorites",
            get(list_favorites).post(add_favorite).delete(remove_favorite),
        )
        .route("/favorites/check", get(check_favorite))
}

/// TMDB ids are positive 32-bit integers.
pub(crate) fn parse_movie_id(raw: Option<&str>) -> AppResult<i32> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("movieId is required".into()))?;
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation("invalid movieId".into()))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<FavoritesResponse> {
    let favorites = state.db.get_favorites(user.id).await;
    Json(FavoritesResponse { favorites })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(body): AppJson<AddFavoriteRequest>,
) -> AppResult<Json<AddFavoriteResponse>> {
    let title = body.movie_title.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let (Some(movie_id), Some(title)) = (body.movie_id, title) else {
        return Err(AppError::Validation("movieId and movieTitle are required".into()));
    };
    let movie_id = parse_movie_id(Some(&movie_id.into_text()))?;
    let poster = body.movie_poster.as_deref().filter(|p| !p.is_empty());

    let favorite = state.db.add_favorite(user.id, movie_id, title, poster).await?;
    info!(movie_id, favorite_id = %favorite.id, "favorite saved");
    Ok(Json(AddFavoriteResponse {
        success: true,
        favorite,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppQuery(q): AppQuery<MovieIdQuery>,
) -> AppResult<Json<Value>> {
    let movie_id = parse_movie_id(q.movie_id.as_deref())?;
    state.db.remove_favorite(user.id, movie_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Without a session the answer is simply `false`.
#[instrument(skip_all)]
pub async fn check_favorite(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    AppQuery(q): AppQuery<MovieIdQuery>,
) -> AppResult<Json<CheckFavoriteResponse>> {
    let Some(user) = user else {
        return Ok(Json(CheckFavoriteResponse { is_favorite: false }));
    };
    let movie_id = parse_movie_id(q.movie_id.as_deref())?;
    let is_favorite = state.db.is_favorite(user.id, movie_id).await;
    Ok(Json(CheckFavoriteResponse { is_favorite }))
}
