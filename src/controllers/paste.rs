use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::content::{content_hash, escape, unescape};
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::ident::{generate_delete_key, Allocator, IdLookup};
use crate::models::{expiry_label, Deleted, FetchedPaste, PasteRow, PutStatus, StoredPaste};

/// Extra rounds of dedup-then-insert after losing an insert race.
const DUPLICATE_RETRIES: u32 = 1;

/// Limits applied by the store on every call.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub max_title_len: usize,
    /// Deadline for each operation against the backing store.
    pub query_timeout: Duration,
}

/// Owns every paste row: dedup, insert, fetch with lazy eviction, delete.
#[derive(Clone)]
pub struct PasteStore {
    database: Database,
    allocator: Allocator,
    options: StoreOptions,
    clock: Arc<dyn Clock>,
}

impl PasteStore {
    pub fn new(
        database: Database,
        allocator: Allocator,
        options: StoreOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        PasteStore {
            database,
            allocator,
            options,
            clock,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Store a paste, or return the existing one holding the same body.
    ///
    /// `ttl_secs == 0` never expires. `base_url` prefixes the returned url.
    pub async fn put(
        &self,
        title: &str,
        body: &str,
        ttl_secs: u64,
        base_url: &str,
    ) -> StoreResult<StoredPaste> {
        self.put_checked_against(&self.database, title, body, ttl_secs, base_url)
            .await
    }

    /// [`put`](Self::put), with id availability answered by `lookup`.
    async fn put_checked_against(
        &self,
        lookup: &impl IdLookup,
        title: &str,
        body: &str,
        ttl_secs: u64,
        base_url: &str,
    ) -> StoreResult<StoredPaste> {
        if body.trim().is_empty() {
            return Err(StoreError::EmptyPaste);
        }
        let title_len = title.chars().count();
        if title_len > self.options.max_title_len {
            return Err(StoreError::TitleTooLong {
                len: title_len,
                max: self.options.max_title_len,
            });
        }

        let escaped_body = escape(body);
        let escaped_title = escape(title);
        let hash = content_hash(&escaped_body);

        for attempt in 0..=DUPLICATE_RETRIES {
            if let Some(existing) = self.find_live_by_hash(&hash).await? {
                debug!("paste data already exists at id '{}'", existing.id);
                return Ok(self.existing(existing, body.len(), base_url));
            }

            let id = self.bounded(self.allocator.allocate(lookup)).await?;
            let now = self.clock.now();
            let expires_at = expiry_after(now.timestamp(), ttl_secs);
            let row = PasteRow {
                title: if escaped_title.is_empty() {
                    id.clone()
                } else {
                    escaped_title.to_string()
                },
                id,
                content_hash: hash.clone(),
                body: escaped_body.to_string(),
                delete_key: generate_delete_key(),
                expires_at,
            };

            match self.bounded(self.database.insert_paste(&row)).await {
                Ok(()) => {
                    info!(
                        "new paste: id='{}', size={}, expires={}",
                        row.id,
                        body.len(),
                        expiry_label(row.expires_at().as_ref())
                    );
                    return Ok(StoredPaste {
                        url: paste_url(base_url, &row.id),
                        expires_at: row.expires_at(),
                        title: unescape(&row.title).into_owned(),
                        id: row.id,
                        content_hash: row.content_hash,
                        size: body.len(),
                        delete_key: Some(row.delete_key),
                        status: PutStatus::Created,
                    });
                }
                Err(StoreError::DuplicateKey) => {
                    warn!("lost insert race for id '{}' (attempt {attempt})", row.id);
                }
                Err(error) => return Err(error),
            }
        }

        // every round collided on the id rather than the content
        if let Some(existing) = self.find_live_by_hash(&hash).await? {
            return Ok(self.existing(existing, body.len(), base_url));
        }
        Err(StoreError::IdContention {
            rounds: DUPLICATE_RETRIES + 1,
        })
    }

    /// Fetch a live paste, evicting it if it has expired.
    pub async fn get(&self, id: &str) -> StoreResult<FetchedPaste> {
        let row = self
            .bounded(self.database.get_paste(id))
            .await?
            .ok_or(StoreError::NotFound)?;

        let now = self.clock.now();
        if row.is_expired(&now) {
            warn!("paste '{id}' is overdue, deleting it");
            self.bounded(self.database.evict_paste(id, now.timestamp()))
                .await?;
            return Err(StoreError::NotFound);
        }

        Ok(FetchedPaste::from_row(row))
    }

    /// Delete the paste matching both `id` and `delete_key`.
    ///
    /// A wrong key and a missing paste are indistinguishable to the caller.
    pub async fn delete(&self, id: &str, delete_key: &str) -> StoreResult<Deleted> {
        let removed = self
            .bounded(self.database.delete_paste(id, delete_key))
            .await?;
        debug!("delete request for '{id}' removed {removed} row(s)");
        Ok(Deleted { found: removed > 0 })
    }

    /// Delete every expired paste. Returns how many were removed.
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let now = self.clock.now();
        let count = self
            .bounded(self.database.purge_expired(now.timestamp()))
            .await?;
        if count > 0 {
            info!("deleted {count} expired pastes");
        }
        Ok(count)
    }

    /// The row holding `hash`, evicting it first if it has expired.
    async fn find_live_by_hash(&self, hash: &str) -> StoreResult<Option<PasteRow>> {
        let Some(row) = self.bounded(self.database.find_by_hash(hash)).await? else {
            return Ok(None);
        };

        let now = self.clock.now();
        if row.is_expired(&now) {
            warn!("paste '{}' with matching content is overdue, deleting it", row.id);
            self.bounded(self.database.evict_paste(&row.id, now.timestamp()))
                .await?;
            return Ok(None);
        }

        Ok(Some(row))
    }

    fn existing(&self, row: PasteRow, size: usize, base_url: &str) -> StoredPaste {
        StoredPaste {
            url: paste_url(base_url, &row.id),
            expires_at: row.expires_at(),
            title: unescape(&row.title).into_owned(),
            id: row.id,
            content_hash: row.content_hash,
            size,
            delete_key: None,
            status: PutStatus::Existing,
        }
    }

    async fn bounded<T>(&self, operation: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        let after = self.options.query_timeout;
        tokio::time::timeout(after, operation)
            .await
            .map_err(|_| StoreError::TimedOut { after })?
    }
}

fn expiry_after(now: i64, ttl_secs: u64) -> Option<i64> {
    if ttl_secs == 0 {
        return None;
    }
    Some(now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)))
}

pub fn paste_url(base_url: &str, id: &str) -> String {
    format!("{}/raw/{id}", base_url.trim_end_matches('/'))
}
