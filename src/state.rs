use crate::config::AppConfig;
use crate::db::{Database, PgStore};
use crate::streaming::{StreamingAggregator, TitleRules};
use crate::tmdb::TmdbClient;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub tmdb: TmdbClient,
    pub streaming: Arc<StreamingAggregator>,
    pub title_rules: Arc<TitleRules>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        config.report_degraded();

        let db = match config.database_url.as_deref() {
            Some(url) => Database::new(Arc::new(PgStore::connect(url).await?)),
            None => Database::unconfigured(),
        };

        // One connection pool for every outbound call.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.streaming.timeout_secs.max(1)))
            .build()?;

        let tmdb = TmdbClient::new(http.clone(), &config.tmdb);
        let streaming = Arc::new(StreamingAggregator::from_config(http, &config.streaming));
        let title_rules = Arc::new(match config.streaming.title_rules_path.as_deref() {
            Some(path) => TitleRules::load(Path::new(path))?,
            None => TitleRules::default(),
        });

        Ok(Self::from_parts(db, config, tmdb, streaming, title_rules))
    }

    pub fn from_parts(
        db: Database,
        config: Arc<AppConfig>,
        tmdb: TmdbClient,
        streaming: Arc<StreamingAggregator>,
        title_rules: Arc<TitleRules>,
    ) -> Self {
        Self {
            db,
            config,
            tmdb,
            streaming,
            title_rules,
        }
    }

    /// In-memory store, no streaming providers, TMDB pointed at a closed port.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, StreamingConfig, TmdbConfig};
        use crate::db::memory::MemoryStore;

        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            tmdb: TmdbConfig {
                api_key: Some("test-key".into()),
                base_url: "http://127.0.0.1:9/3".into(),
                image_base_url: "https://image.tmdb.org/t/p".into(),
            },
            streaming: StreamingConfig {
                phim_base_url: "http://127.0.0.1:9".into(),
                consumet_base_url: "http://127.0.0.1:9".into(),
                timeout_secs: 1,
                title_rules_path: None,
            },
            production: false,
            auto_init_db: false,
        });

        Self::from_parts(
            Database::new(Arc::new(MemoryStore::new())),
            config.clone(),
            TmdbClient::new(reqwest::Client::new(), &config.tmdb),
            Arc::new(StreamingAggregator::new(vec![], Duration::from_millis(50))),
            Arc::new(TitleRules::default()),
        )
    }
}
