use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::{map_db_error, PgStore},
    error::AppResult,
    favorites::repo_types::Favorite,
};

#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    /// Inserts the favorite or returns the row already stored for (user, movie).
    async fn upsert_favorite(
        &self,
        user_id: Uuid,
        movie_id: i32,
        movie_title: &str,
        movie_poster: Option<&str>,
    ) -> AppResult<Favorite>;
    /// Returns the number of rows deleted (0 or 1).
    async fn delete_favorite(&self, user_id: Uuid, movie_id: i32) -> AppResult<u64>;
    async fn list_favorites(&self, user_id: Uuid) -> AppResult<Vec<Favorite>>;
    async fn favorite_exists(&self, user_id: Uuid, movie_id: i32) -> AppResult<bool>;
    async fn count_favorites(&self, user_id: Uuid) -> AppResult<i64>;
}

#[async_trait]
impl FavoriteRepo for PgStore {
    async fn upsert_favorite(
        &self,
        user_id: Uuid,
        movie_id: i32,
        movie_title: &str,
        movie_poster: Option<&str>,
    ) -> AppResult<Favorite> {
        // The no-op update makes RETURNING yield the existing row on conflict,
        // keeping the first title/poster snapshot.
        sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, movie_id, movie_title, movie_poster)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, movie_id)
            DO UPDATE SET movie_id = favorites.movie_id
            RETURNING id, user_id, movie_id, movie_title, movie_poster, created_at
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(movie_title)
        .bind(movie_poster)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_favorite(&self, user_id: Uuid, movie_id: i32) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM favorites
             WHERE user_id = $1 AND movie_id = $2
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn list_favorites(&self, user_id: Uuid) -> AppResult<Vec<Favorite>> {
        sqlx::query_as::<_, Favorite>(
            r#"
            SELECT id, user_id, movie_id, movie_title, movie_poster, created_at
              FROM favorites
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn favorite_exists(&self, user_id: Uuid, movie_id: i32) -> AppResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM favorites WHERE user_id = $1 AND movie_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(exists)
    }

    async fn count_favorites(&self, user_id: Uuid) -> AppResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM favorites WHERE user_id = $1"#)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error)?;
        Ok(count)
    }
}
