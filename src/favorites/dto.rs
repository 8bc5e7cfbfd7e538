use serde::{Deserialize, Serialize};

use crate::favorites::repo_types::Favorite;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteRequest {
    pub movie_id: Option<MovieIdField>,
    pub movie_title: Option<String>,
    pub movie_poster: Option<String>,
}

/// Clients send the id either as a JSON number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MovieIdField {
    Number(i64),
    Text(String),
}

impl MovieIdField {
    pub fn into_text(self) -> String {
        match self {
            MovieIdField::Number(n) => n.to_string(),
            MovieIdField::Text(s) => s,
        }
    }
}

/// `?movieId=` kept as raw text so a missing or malformed value maps to 400.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieIdQuery {
    pub movie_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub favorites: Vec<Favorite>,
}

#[derive(Debug, Serialize)]
pub struct AddFavoriteResponse {
    pub success: bool,
    pub favorite: Favorite,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckFavoriteResponse {
    pub is_favorite: bool,
}
