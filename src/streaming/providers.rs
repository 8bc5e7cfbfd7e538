//! Unofficial streaming indexes. Both are unreliable: every call is bounded and
//! every failure is reported to the caller as an error, never a panic.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client as HttpClient, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tokio::time::timeout;
use tracing::debug;

use super::dto::StreamingLink;

const BROWSER_AGENT: &str = "Mozilla/5.0";
const MAX_LINKS: usize = 5;
const LINK_ICON: &str = "pelisplus";

#[derive(Debug, Clone)]
pub struct LinkQuery {
    pub title: String,
    pub tmdb_id: Option<i64>,
}

#[async_trait]
pub trait LinkProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(vec![])` means the provider had nothing for this movie.
    async fn lookup(&self, query: &LinkQuery) -> anyhow::Result<Vec<StreamingLink>>;
}

/// `base` plus percent-encoded path segments.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> anyhow::Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid provider url {base}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("provider url {base} cannot have a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// GET + decode, the whole exchange bounded by `bound`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    http: &HttpClient,
    url: Url,
    bound: Duration,
) -> anyhow::Result<T> {
    debug!(%url, "provider request");
    let exchange = async {
        http.get(url.clone())
            .header(USER_AGENT, BROWSER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    };
    let body = timeout(bound, exchange)
        .await
        .with_context(|| format!("{url} timed out after {bound:?}"))??;
    Ok(body)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// --- phimapi: TMDB id -> slug -> first episode's servers ---

#[derive(Debug, Deserialize)]
pub(crate) struct PhimLookup {
    pub movie: Option<PhimMovieRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhimMovieRef {
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhimDetail {
    pub movie: Option<PhimMovie>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhimMovie {
    #[serde(default)]
    pub episodes: Vec<PhimEpisode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhimEpisode {
    #[serde(default)]
    pub server_data: Vec<PhimServer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhimServer {
    pub name: Option<String>,
    pub link_embed: Option<String>,
    pub link_m3u8: Option<String>,
}

pub(crate) fn phim_links(detail: PhimDetail, detail_page: &str) -> Vec<StreamingLink> {
    let Some(episode) = detail
        .movie
        .and_then(|m| m.episodes.into_iter().next())
    else {
        return Vec::new();
    };
    episode
        .server_data
        .into_iter()
        .take(MAX_LINKS)
        .enumerate()
        .map(|(i, server)| {
            let name = non_empty(server.name).unwrap_or_else(|| format!("Servidor {}", i + 1));
            let url = non_empty(server.link_embed)
                .or_else(|| non_empty(server.link_m3u8))
                .unwrap_or_else(|| detail_page.to_string());
            StreamingLink::new(name, url, LINK_ICON)
        })
        .collect()
}

pub struct PhimProvider {
    http: HttpClient,
    base_url: String,
    step: Duration,
}

impl PhimProvider {
    pub fn new(http: HttpClient, base_url: impl Into<String>, step: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            step,
        }
    }
}

#[async_trait]
impl LinkProvider for PhimProvider {
    fn name(&self) -> &'static str {
        "phimapi"
    }

    async fn lookup(&self, query: &LinkQuery) -> anyhow::Result<Vec<StreamingLink>> {
        let Some(tmdb_id) = query.tmdb_id else {
            return Ok(Vec::new());
        };
        let id = tmdb_id.to_string();
        let lookup: PhimLookup =
            fetch_json(&self.http, endpoint(&self.base_url, &["tmdb", "movie", &id])?, self.step)
                .await?;
        let Some(slug) = non_empty(lookup.movie.and_then(|m| m.slug)) else {
            return Ok(Vec::new());
        };

        let detail_url = endpoint(&self.base_url, &["phim", &slug])?;
        let detail: PhimDetail = fetch_json(&self.http, detail_url.clone(), self.step).await?;
        Ok(phim_links(detail, detail_url.as_str()))
    }
}

// --- consumet flixhq: title search -> top match -> sources ---

#[derive(Debug, Deserialize)]
pub(crate) struct ConsumetSearch {
    #[serde(default)]
    pub results: Vec<ConsumetResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsumetResult {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsumetInfo {
    #[serde(default)]
    pub sources: Vec<ConsumetSource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConsumetSource {
    pub quality: Option<String>,
    pub url: Option<String>,
}

pub(crate) fn consumet_links(info: ConsumetInfo) -> Vec<StreamingLink> {
    info.sources
        .into_iter()
        .take(MAX_LINKS)
        .enumerate()
        .filter_map(|(i, source)| {
            let url = non_empty(source.url)?;
            let name = non_empty(source.quality).unwrap_or_else(|| format!("Opción {}", i + 1));
            Some(StreamingLink::new(name, url, LINK_ICON))
        })
        .collect()
}

pub struct ConsumetProvider {
    http: HttpClient,
    base_url: String,
    step: Duration,
}

impl ConsumetProvider {
    pub fn new(http: HttpClient, base_url: impl Into<String>, step: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            step,
        }
    }
}

#[async_trait]
impl LinkProvider for ConsumetProvider {
    fn name(&self) -> &'static str {
        "consumet"
    }

    async fn lookup(&self, query: &LinkQuery) -> anyhow::Result<Vec<StreamingLink>> {
        let search_url = endpoint(&self.base_url, &["movies", "flixhq", &query.title])?;
        let search: ConsumetSearch = fetch_json(&self.http, search_url, self.step).await?;
        let Some(id) = search
            .results
            .into_iter()
            .next()
            .and_then(|r| non_empty(r.id))
        else {
            return Ok(Vec::new());
        };

        let mut info_url = endpoint(&self.base_url, &["movies", "flixhq", "info"])?;
        info_url.query_pairs_mut().append_pair("id", &id);
        let info: ConsumetInfo = fetch_json(&self.http, info_url, self.step).await?;
        Ok(consumet_links(info))
    }
}
