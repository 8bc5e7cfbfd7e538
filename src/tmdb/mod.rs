//! TMDB movie metadata: HTTP client, payload types and the release-status rule.

pub mod client;
pub mod status;
pub mod types;

pub use client::TmdbClient;
