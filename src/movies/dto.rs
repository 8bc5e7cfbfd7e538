use serde::{Deserialize, Serialize};

use crate::tmdb::{
    status::ReleaseStatus,
    types::{Genre, Movie, MovieDetails},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsQuery {
    pub movie_id: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub results: Vec<Movie>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    pub now_playing: Vec<Movie>,
    pub popular: Vec<Movie>,
    pub upcoming: Vec<Movie>,
}

/// TMDB details plus the fields the catalogue UI renders directly.
/// TMDB already owns `status` ("Released", ...), hence `releaseStatus`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetailsResponse {
    #[serde(flatten)]
    pub details: MovieDetails,
    pub release_status: ReleaseStatus,
    pub release_status_label: &'static str,
    pub poster_url: String,
    pub backdrop_url: String,
}

#[derive(Debug, Serialize)]
pub struct GenreListResponse {
    pub genres: Vec<Genre>,
}
