use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::{map_db_error, PgStore},
    error::AppResult,
    history::repo_types::SearchHistoryEntry,
};

#[async_trait]
pub trait HistoryRepo: Send + Sync {
    async fn insert_search(&self, user_id: Uuid, query: &str) -> AppResult<SearchHistoryEntry>;
    async fn list_searches(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<SearchHistoryEntry>>;
    /// Returns the number of rows deleted.
    async fn delete_searches(&self, user_id: Uuid) -> AppResult<u64>;
}

#[async_trait]
impl HistoryRepo for PgStore {
    async fn insert_search(&self, user_id: Uuid, query: &str) -> AppResult<SearchHistoryEntry> {
        sqlx::query_as::<_, SearchHistoryEntry>(
            r#"
            INSERT INTO search_history (user_id, query)
            VALUES ($1, $2)
            RETURNING id, user_id, query, created_at
            "#,
        )
        .bind(user_id)
        .bind(query)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_searches(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<SearchHistoryEntry>> {
        sqlx::query_as::<_, SearchHistoryEntry>(
            r#"
            SELECT id, user_id, query, created_at
              FROM search_history
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_searches(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(r#"DELETE FROM search_history WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}
