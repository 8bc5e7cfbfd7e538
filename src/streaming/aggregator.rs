use std::{sync::Arc, time::Duration};

use reqwest::Client as HttpClient;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{
    dto::StreamingLink,
    providers::{ConsumetProvider, LinkProvider, LinkQuery, PhimProvider},
};
use crate::config::StreamingConfig;

/// Tries providers in order and returns the first non-empty answer.
pub struct StreamingAggregator {
    providers: Vec<Arc<dyn LinkProvider>>,
    /// Upper bound for one provider: each makes at most two bounded calls.
    provider_budget: Duration,
}

impl StreamingAggregator {
    pub fn new(providers: Vec<Arc<dyn LinkProvider>>, step: Duration) -> Self {
        Self {
            providers,
            provider_budget: step * 2,
        }
    }

    pub fn from_config(http: HttpClient, cfg: &StreamingConfig) -> Self {
        let step = Duration::from_secs(cfg.timeout_secs.max(1));
        Self::new(
            vec![
                Arc::new(PhimProvider::new(http.clone(), cfg.phim_base_url.clone(), step)),
                Arc::new(ConsumetProvider::new(http, cfg.consumet_base_url.clone(), step)),
            ],
            step,
        )
    }

    /// `None` when every provider failed or came back empty. Never errors.
    #[instrument(skip(self), fields(title = %query.title, tmdb_id = ?query.tmdb_id))]
    pub async fn resolve(&self, query: &LinkQuery) -> Option<Vec<StreamingLink>> {
        for provider in &self.providers {
            match timeout(self.provider_budget, provider.lookup(query)).await {
                Ok(Ok(links)) if !links.is_empty() => {
                    info!(provider = provider.name(), count = links.len(), "streaming links found");
                    return Some(links);
                }
                Ok(Ok(_)) => debug!(provider = provider.name(), "no links"),
                Ok(Err(e)) => warn!(provider = provider.name(), error = %e, "lookup failed"),
                Err(_) => warn!(provider = provider.name(), "lookup timed out"),
            }
        }
        None
    }
}
