use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingLink {
    pub name: String,
    pub url: String,
    pub icon: String,
}

impl StreamingLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            icon: icon.into(),
        }
    }
}

/// `tmdbId` stays raw text: an unparseable id is ignored, not rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingQuery {
    pub title: Option<String>,
    pub tmdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FallbackQuery {
    pub title: Option<String>,
    pub year: Option<String>,
}

/// `links` is `null` when no provider produced anything.
#[derive(Debug, Serialize)]
pub struct StreamingResponse {
    pub success: bool,
    pub links: Option<Vec<StreamingLink>>,
}

#[derive(Debug, Serialize)]
pub struct FallbackResponse {
    pub links: Vec<StreamingLink>,
}
