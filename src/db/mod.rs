use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{repo::UserRepo, repo_types::User},
    error::{AppError, AppResult},
    favorites::{repo::FavoriteRepo, repo_types::Favorite},
    history::{repo::HistoryRepo, repo_types::SearchHistoryEntry},
};

pub mod handlers;
#[cfg(test)]
pub mod memory;

pub fn router() -> axum::Router<crate::state::AppState> {
    handlers::db_routes()
}

/// Idempotent schema. Statements run one by one; each is atomic on its own.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email VARCHAR(255) NOT NULL,
        username VARCHAR(100) NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT users_email_key UNIQUE (email),
        CONSTRAINT users_username_key UNIQUE (username)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS search_history (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        query VARCHAR(500) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_search_history_user_id ON search_history(user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS favorites (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        movie_id INTEGER NOT NULL,
        movie_title VARCHAR(500) NOT NULL,
        movie_poster VARCHAR(500),
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        CONSTRAINT favorites_user_movie_key UNIQUE (user_id, movie_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_favorites_user_id ON favorites(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_favorites_movie_id ON favorites(movie_id)",
];

/// Everything the service persists, behind one object-safe seam.
#[async_trait]
pub trait Store: UserRepo + FavoriteRepo + HistoryRepo + Send + Sync {
    async fn init_schema(&self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn init_schema(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;
        }
        info!(statements = SCHEMA.len(), "database schema ensured");
        Ok(())
    }
}

/// Translates driver errors into the app taxonomy.
pub(crate) fn map_db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("42P01") {
            return AppError::Schema;
        }
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("users_email_key") => "email already registered",
                Some("users_username_key") => "username already taken",
                _ => "record already exists",
            };
            return AppError::Conflict(message.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::Auth("session user no longer exists".to_string());
        }
    }
    AppError::Store(err)
}

/// Persistence facade.
///
/// Applies the read/write policy on top of a [`Store`]: auxiliary reads (user
/// lookups, favorites) log and degrade to empty results when the store is
/// missing or failing, while writes and the search-history listing surface the
/// error to the caller.
#[derive(Clone)]
pub struct Database {
    store: Option<Arc<dyn Store>>,
}

impl Database {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store: Some(store) }
    }

    pub fn unconfigured() -> Self {
        Self { store: None }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub fn ensure_configured(&self) -> AppResult<()> {
        self.required().map(|_| ())
    }

    fn required(&self) -> AppResult<&Arc<dyn Store>> {
        self.store
            .as_ref()
            .ok_or_else(|| AppError::Config("DATABASE_URL is not set".into()))
    }

    fn optional(&self, op: &'static str) -> Option<&Arc<dyn Store>> {
        if self.store.is_none() {
            debug!(op, "store unconfigured, returning empty result");
        }
        self.store.as_ref()
    }

    pub async fn initialize_database(&self) -> AppResult<()> {
        self.required()?.init_schema().await
    }

    // ---- users ----

    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> AppResult<User> {
        self.required()?
            .create_user(email, username, password_hash)
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Option<User> {
        let store = self.optional("get_user_by_email")?;
        store
            .find_user_by_email(email)
            .await
            .unwrap_or_else(|e| degraded("get_user_by_email", e))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Option<User> {
        let store = self.optional("get_user_by_username")?;
        store
            .find_user_by_username(username)
            .await
            .unwrap_or_else(|e| degraded("get_user_by_username", e))
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Option<User> {
        let store = self.optional("get_user_by_id")?;
        store
            .find_user_by_id(id)
            .await
            .unwrap_or_else(|e| degraded("get_user_by_id", e))
    }

    // ---- favorites ----

    pub async fn add_favorite(
        &self,
        user_id: Uuid,
        movie_id: i32,
        movie_title: &str,
        movie_poster: Option<&str>,
    ) -> AppResult<Favorite> {
        self.required()?
            .upsert_favorite(user_id, movie_id, movie_title, movie_poster)
            .await
    }

    pub async fn remove_favorite(&self, user_id: Uuid, movie_id: i32) -> AppResult<()> {
        let removed = self.required()?.delete_favorite(user_id, movie_id).await?;
        debug!(%user_id, movie_id, removed, "favorite removed");
        Ok(())
    }

    pub async fn get_favorites(&self, user_id: Uuid) -> Vec<Favorite> {
        let Some(store) = self.optional("get_favorites") else {
            return Vec::new();
        };
        store
            .list_favorites(user_id)
            .await
            .unwrap_or_else(|e| degraded("get_favorites", e))
    }

    pub async fn is_favorite(&self, user_id: Uuid, movie_id: i32) -> bool {
        let Some(store) = self.optional("is_favorite") else {
            return false;
        };
        store
            .favorite_exists(user_id, movie_id)
            .await
            .unwrap_or_else(|e| degraded("is_favorite", e))
    }

    pub async fn get_favorite_count(&self, user_id: Uuid) -> i64 {
        let Some(store) = self.optional("get_favorite_count") else {
            return 0;
        };
        store
            .count_favorites(user_id)
            .await
            .unwrap_or_else(|e| degraded("get_favorite_count", e))
    }

    // ---- search history ----

    pub async fn add_search_history(
        &self,
        user_id: Uuid,
        query: &str,
    ) -> AppResult<SearchHistoryEntry> {
        self.required()?.insert_search(user_id, query).await
    }

    pub async fn get_search_history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<SearchHistoryEntry>> {
        self.required()?.list_searches(user_id, limit).await
    }

    pub async fn clear_search_history(&self, user_id: Uuid) -> AppResult<()> {
        let removed = self.required()?.delete_searches(user_id).await?;
        debug!(%user_id, removed, "search history cleared");
        Ok(())
    }
}

fn degraded<T: Default>(op: &'static str, err: AppError) -> T {
    warn!(op, error = %err, "store read failed, returning empty result");
    T::default()
}
