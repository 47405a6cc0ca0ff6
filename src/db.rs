use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::info;

use crate::config;
use crate::error::StoreResult;
use crate::ident::IdLookup;
use crate::models::PasteRow;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS paste (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    content_hash TEXT NOT NULL UNIQUE,
    body TEXT NOT NULL,
    delete_key TEXT NOT NULL,
    expires_at BIGINT
)";

const PASTE_COLUMNS: &str = "id, title, content_hash, body, delete_key, expires_at";

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to a database and make sure the paste table exists.
    pub async fn connect(config: &config::Database) -> StoreResult<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        let database = Self { pool };
        database.migrate().await?;

        info!("connected to database");

        Ok(database)
    }

    async fn migrate(&self) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(SCHEMA).execute(&mut conn).await?;
        Ok(())
    }

    /// Get a paste by id.
    pub async fn get_paste(&self, id: &str) -> StoreResult<Option<PasteRow>> {
        let mut conn = self.pool.acquire().await?;
        let paste = sqlx::query_as::<_, PasteRow>(&format!(
            "SELECT {PASTE_COLUMNS} FROM paste WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut conn)
        .await?;
        Ok(paste)
    }

    /// Get a paste by the hash of its escaped body.
    pub async fn find_by_hash(&self, content_hash: &str) -> StoreResult<Option<PasteRow>> {
        let mut conn = self.pool.acquire().await?;
        let paste = sqlx::query_as::<_, PasteRow>(&format!(
            "SELECT {PASTE_COLUMNS} FROM paste WHERE content_hash = ?"
        ))
        .bind(content_hash)
        .fetch_optional(&mut conn)
        .await?;
        Ok(paste)
    }

    /// Insert a paste. Fails with `DuplicateKey` if the id or hash is taken.
    pub async fn insert_paste(&self, paste: &PasteRow) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(&format!(
            "INSERT INTO paste ({PASTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(paste.id.as_str())
        .bind(paste.title.as_str())
        .bind(paste.content_hash.as_str())
        .bind(paste.body.as_str())
        .bind(paste.delete_key.as_str())
        .bind(paste.expires_at)
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    /// Delete a paste matching both id and delete key. Returns rows removed.
    pub async fn delete_paste(&self, id: &str, delete_key: &str) -> StoreResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM paste WHERE id = ? AND delete_key = ?")
            .bind(id)
            .bind(delete_key)
            .execute(&mut conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a paste by id, but only if it has expired as of `now`.
    pub async fn evict_paste(&self, id: &str, now: i64) -> StoreResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "DELETE FROM paste WHERE id = ? AND expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(id)
        .bind(now)
        .execute(&mut conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every paste that has expired as of `now`.
    pub async fn purge_expired(&self, now: i64) -> StoreResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let result =
            sqlx::query("DELETE FROM paste WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now)
                .execute(&mut conn)
                .await?;
        Ok(result.rows_affected())
    }

    /// Number of stored rows, live or not.
    #[cfg(test)]
    pub(crate) async fn count_pastes(&self) -> StoreResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM paste")
            .fetch_one(&mut conn)
            .await?;
        Ok(count)
    }

    /// Check out a connection and keep it until the guard drops.
    #[cfg(test)]
    pub(crate) async fn hold_connection(
        &self,
    ) -> StoreResult<sqlx::pool::PoolConnection<sqlx::Any>> {
        Ok(self.pool.acquire().await?)
    }
}

impl IdLookup for Database {
    async fn id_exists(&self, id: &str) -> StoreResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM paste WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut conn)
            .await?;
        Ok(row.is_some())
    }
}
