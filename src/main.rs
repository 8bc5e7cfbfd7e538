mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod favorites;
mod history;
mod movies;
mod state;
mod streaming;
mod tmdb;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cartelera=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    error::set_detailed_errors(!app_state.config.production);

    if app_state.config.auto_init_db && app_state.db.is_configured() {
        if let Err(e) = app_state.db.initialize_database().await {
            tracing::warn!(error = %e, "schema initialization failed; POST /api/init-db to retry");
        }
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}
