//! In-process [`Store`] used by tests. Emulates the constraints the Postgres
//! schema enforces: unique email/username, unique (user, movie) favorites and
//! cascade deletes.

use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::{repo::UserRepo, repo_types::User},
    db::Store,
    error::{AppError, AppResult},
    favorites::{repo::FavoriteRepo, repo_types::Favorite},
    history::{repo::HistoryRepo, repo_types::SearchHistoryEntry},
};

#[derive(Default)]
struct Tables {
    initialized: bool,
    tick: i64,
    users: Vec<User>,
    favorites: Vec<Favorite>,
    history: Vec<SearchHistoryEntry>,
}

impl Tables {
    /// Strictly increasing timestamps so ordering assertions are deterministic.
    fn now(&mut self) -> OffsetDateTime {
        self.tick += 1;
        OffsetDateTime::UNIX_EPOCH + Duration::days(20_000) + Duration::milliseconds(self.tick)
    }

    fn check_schema(&self) -> AppResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(AppError::Schema)
        }
    }

    fn check_user(&self, user_id: Uuid) -> AppResult<()> {
        if self.users.iter().any(|u| u.id == user_id) {
            Ok(())
        } else {
            Err(AppError::Auth("session user no longer exists".into()))
        }
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                initialized: true,
                ..Tables::default()
            }),
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Administrative delete; cascades like the foreign keys do.
    pub fn delete_user(&self, user_id: Uuid) {
        let mut t = self.tables.lock().unwrap();
        t.users.retain(|u| u.id != user_id);
        t.favorites.retain(|f| f.user_id != user_id);
        t.history.retain(|h| h.user_id != user_id);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn init_schema(&self) -> AppResult<()> {
        self.tables.lock().unwrap().initialized = true;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> AppResult<User> {
        let mut t = self.tables.lock().unwrap();
        t.check_schema()?;
        if t.users.iter().any(|u| u.email == email) {
            return Err(AppError::Conflict("email already registered".into()));
        }
        if t.users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict("username already taken".into()));
        }
        let created_at = t.now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let t = self.tables.lock().unwrap();
        t.check_schema()?;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let t = self.tables.lock().unwrap();
        t.check_schema()?;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let t = self.tables.lock().unwrap();
        t.check_schema()?;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl FavoriteRepo for MemoryStore {
    async fn upsert_favorite(
        &self,
        user_id: Uuid,
        movie_id: i32,
        movie_title: &str,
        movie_poster: Option<&str>,
    ) -> AppResult<Favorite> {
        let mut t = self.tables.lock().unwrap();
        t.check_schema()?;
        t.check_user(user_id)?;
        if let Some(existing) = t
            .favorites
            .iter()
            .find(|f| f.user_id == user_id && f.movie_id == movie_id)
        {
            return Ok(existing.clone());
        }
        let created_at = t.now();
        let favorite = Favorite {
            id: Uuid::new_v4(),
            user_id,
            movie_id,
            movie_title: movie_title.to_string(),
            movie_poster: movie_poster.map(str::to_string),
            created_at,
        };
        t.favorites.push(favorite.clone());
        Ok(favorite)
    }

    async fn delete_favorite(&self, user_id: Uuid, movie_id: i32) -> AppResult<u64> {
        let mut t = self.tables.lock().unwrap();
        t.check_schema()?;
        let before = t.favorites.len();
        t.favorites
            .retain(|f| !(f.user_id == user_id && f.movie_id == movie_id));
        Ok((before - t.favorites.len()) as u64)
    }

    async fn list_favorites(&self, user_id: Uuid) -> AppResult<Vec<Favorite>> {
        let t = self.tables.lock().unwrap();
        t.check_schema()?;
        let mut rows: Vec<Favorite> = t
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn favorite_exists(&self, user_id: Uuid, movie_id: i32) -> AppResult<bool> {
        let t = self.tables.lock().unwrap();
        t.check_schema()?;
        Ok(t
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.movie_id == movie_id))
    }

    async fn count_favorites(&self, user_id: Uuid) -> AppResult<i64> {
        let t = self.tables.lock().unwrap();
        t.check_schema()?;
        Ok(t.favorites.iter().filter(|f| f.user_id == user_id).count() as i64)
    }
}

#[async_trait]
impl HistoryRepo for MemoryStore {
    async fn insert_search(&self, user_id: Uuid, query: &str) -> AppResult<SearchHistoryEntry> {
        let mut t = self.tables.lock().unwrap();
        t.check_schema()?;
        t.check_user(user_id)?;
        let created_at = t.now();
        let entry = SearchHistoryEntry {
            id: Uuid::new_v4(),
            user_id,
            query: query.to_string(),
            created_at,
        };
        t.history.push(entry.clone());
        Ok(entry)
    }

    async fn list_searches(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<SearchHistoryEntry>> {
        let t = self.tables.lock().unwrap();
        t.check_schema()?;
        let mut rows: Vec<SearchHistoryEntry> = t
            .history
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn delete_searches(&self, user_id: Uuid) -> AppResult<u64> {
        let mut t = self.tables.lock().unwrap();
        t.check_schema()?;
        let before = t.history.len();
        t.history.retain(|h| h.user_id != user_id);
        Ok((before - t.history.len()) as u64)
    }
}
