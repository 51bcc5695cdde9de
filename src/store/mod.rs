//! SQLite-backed persistence for saved items and provider sessions.

mod items;
pub mod schema;
mod sessions;
pub mod types;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub use types::{ExtractedContent, ItemFilter, ItemStatus, SavedItem, Session, StoreError};

const MAX_CONNECTIONS: u32 = 5;

/// Handle to the relational store. Cheap to clone; clones share one pool.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to `database_url` and make sure the schema exists.
    ///
    /// In-memory databases are pinned to a single connection that is never recycled, because
    /// every SQLite connection would otherwise see its own empty database.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options.connect_with(options).await?;
        schema::ensure_schema(&pool).await?;
        tracing::info!(in_memory, "Store connected");
        Ok(Self { pool })
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
