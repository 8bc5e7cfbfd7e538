//! Deterministic search links used when no provider returns anything.

use std::path::Path;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::dto::StreamingLink;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TitleMapping {
    pub pattern: String,
    pub replacement: String,
}

/// Rewrites that turn a catalogue title into something the PelisPlus search
/// actually finds. Mappings are checked in order against the folded title;
/// the first substring hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TitleRules {
    pub mappings: Vec<TitleMapping>,
    pub stop_words: Vec<String>,
    /// Shorter words are dropped from the keyword search.
    pub min_word_len: usize,
}

impl Default for TitleRules {
    fn default() -> Self {
        let mappings = [
            ("el conjuro 4", "expediente warren"),
            ("conjuro 4", "expediente warren"),
            ("el conjuro 4 ultimos ritos", "expediente warren ultimo rito"),
            ("ultimos ritos", "expediente warren ultimo rito"),
            ("the conjuring last rites", "conjuring last rites"),
            ("conjuring last rites", "conjuring last rites"),
            ("the conjuring", "conjuring"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| TitleMapping {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        })
        .collect();

        let stop_words = ["el", "la", "los", "las", "un", "una", "de", "del", "y", "en", "a", "the"]
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            mappings,
            stop_words,
            min_word_len: 3,
        }
    }
}

impl TitleRules {
    /// Reads a JSON rules table; absent keys keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading title rules from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing title rules in {}", path.display()))
    }
}

/// Lowercase with diacritics stripped: "Él Conjuro" -> "el conjuro".
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Folded title with every run of non `[a-z0-9]` characters replaced by `sep`.
pub fn slug(title: &str, sep: char) -> String {
    let mut out = String::new();
    let mut pending = false;
    for c in fold(title).chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending && !out.is_empty() {
                out.push(sep);
            }
            pending = false;
            out.push(c);
        } else {
            pending = true;
        }
    }
    out
}

pub fn optimized_search_title(title: &str, rules: &TitleRules) -> String {
    lazy_static! {
        static ref PART_N: Regex = Regex::new(r"(?i)\b(parte|part)\s+\d+\b").unwrap();
        static ref NUMBER_COLON: Regex = Regex::new(r"\b\d+\s*:\s*").unwrap();
        static ref TRAILING_NUMBER: Regex = Regex::new(r"\b\d+\s*$").unwrap();
        static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
    }

    let folded = fold(title);
    let folded = folded.trim();
    if let Some(m) = rules.mappings.iter().find(|m| folded.contains(m.pattern.as_str())) {
        return m.replacement.clone();
    }

    let stripped = PART_N.replace_all(folded, "");
    let stripped = NUMBER_COLON.replace_all(&stripped, "");
    let stripped = TRAILING_NUMBER.replace_all(&stripped, "");
    let stripped = SPACES.replace_all(&stripped, " ");
    let stripped = stripped.trim();

    let keywords: Vec<&str> = stripped
        .split(' ')
        .filter(|w| w.chars().count() >= rules.min_word_len)
        .filter(|w| !rules.stop_words.iter().any(|s| s == w))
        .collect();
    if keywords.is_empty() {
        stripped.to_string()
    } else {
        keywords.join(" ")
    }
}

lazy_static! {
    static ref PELISPLUS_SEARCH: Url = Url::parse("https://ww3.pelisplus.to/search/").unwrap();
    static ref GOOGLE_SEARCH: Url = Url::parse("https://www.google.com/search").unwrap();
}

fn path_search(base: &Url, term: &str) -> String {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(term);
    }
    url.into()
}

/// Search links on the fixed list of sites, in display order.
pub fn fallback_links(title: &str, year: Option<i32>, rules: &TitleRules) -> Vec<StreamingLink> {
    let plus = slug(title, '+');
    let dash = slug(title, '-');
    let la_movie = match year {
        Some(year) => format!("{dash}-{year}"),
        None => dash,
    };

    let mut google = GOOGLE_SEARCH.clone();
    google
        .query_pairs_mut()
        .append_pair("q", &format!("{title} ver online español latino"));

    vec![
        StreamingLink::new(
            "Cinecalidad",
            format!("https://www.cinecalidad.ec/?s={plus}"),
            "cinecalidad",
        ),
        StreamingLink::new(
            "PelisPlus",
            path_search(&PELISPLUS_SEARCH, &optimized_search_title(title, rules)),
            "pelisplus",
        ),
        StreamingLink::new(
            "PeliCineHD",
            format!("https://pelicinehd.com/?s={plus}"),
            "pelicinehd",
        ),
        StreamingLink::new(
            "GnulaHD",
            format!("https://ww3.gnulahd.nu/?s={plus}"),
            "gnulahd",
        ),
        StreamingLink::new(
            "La.Movie",
            format!("https://la.movie/peliculas/{la_movie}"),
            "la-movie",
        ),
        StreamingLink::new("Buscar en Google", String::from(google), "google"),
    ]
}
