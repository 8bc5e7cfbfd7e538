use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    pub phim_base_url: String,
    pub consumet_base_url: String,
    pub timeout_secs: u64,
    pub title_rules_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service in degraded mode: reads come back empty, writes fail.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub tmdb: TmdbConfig,
    pub streaming: StreamingConfig,
    pub production: bool,
    pub auto_init_db: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = non_empty_var("DATABASE_URL").or_else(|| non_empty_var("POSTGRES_URL"));

        let secret = non_empty_var("JWT_SECRET")
            .or_else(|| non_empty_var("AUTH_SECRET"))
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET (or AUTH_SECRET) must be set"))?;
        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cartelera".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "cartelera-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 30),
        };

        let tmdb = TmdbConfig {
            api_key: non_empty_var("TMDB_API_KEY"),
            base_url: std::env::var("TMDB_BASE_URL")
                .unwrap_or_else(|_| "https://api.themoviedb.org/3".into()),
            image_base_url: std::env::var("TMDB_IMAGE_BASE_URL")
                .unwrap_or_else(|_| "https://image.tmdb.org/t/p".into()),
        };

        let streaming = StreamingConfig {
            phim_base_url: std::env::var("PHIM_BASE_URL")
                .unwrap_or_else(|_| "https://phimapi.com".into()),
            consumet_base_url: std::env::var("CONSUMET_BASE_URL")
                .unwrap_or_else(|_| "https://api.consumet.org".into()),
            timeout_secs: std::env::var("STREAMING_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5),
            title_rules_path: non_empty_var("TITLE_RULES_PATH"),
        };

        let production = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let auto_init_db = std::env::var("DB_AUTO_INIT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            jwt,
            tmdb,
            streaming,
            production,
            auto_init_db,
        })
    }

    /// Logs every optional component that is missing, once, at startup.
    pub fn report_degraded(&self) {
        if self.database_url.is_none() {
            tracing::warn!(
                "DATABASE_URL is not set: favorites, search history and accounts are unavailable"
            );
        }
        if self.tmdb.api_key.is_none() {
            tracing::warn!("TMDB_API_KEY is not set: movie metadata endpoints will fail");
        }
        if self.jwt.secret.len() < 32 {
            tracing::warn!("JWT_SECRET is shorter than 32 bytes");
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
