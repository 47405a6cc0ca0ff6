//! A content-addressed paste store with short links, expiry and delete keys.

use std::sync::Arc;

use axum::extract::FromRef;

pub mod clock;
pub mod commands;
pub mod config;
pub mod content;
pub mod controllers;
pub mod db;
pub mod error;
pub mod ident;
pub mod models;
pub mod types;

pub use config::Config;
pub use controllers::paste::{PasteStore, StoreOptions};
pub use error::{ApiError, ApiResult, StoreError, StoreResult};

use clock::{Clock, SystemClock};
use db::Database;
use ident::Allocator;

/// Everything the commands and request handlers need.
#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub store: PasteStore,
}

impl App {
    /// Connect to the configured database and build the store.
    pub async fn connect(config: Config) -> StoreResult<Self> {
        let database = Database::connect(&config.database).await?;
        Ok(Self::with_database(config, database, Arc::new(SystemClock)))
    }

    pub fn with_database(config: Config, database: Database, clock: Arc<dyn Clock>) -> Self {
        let store = PasteStore::new(
            database,
            Allocator::new(config.ids),
            StoreOptions {
                max_title_len: config.limits.max_title_len,
                query_timeout: config.limits.query_timeout(),
            },
            clock,
        );
        App { config, store }
    }
}
