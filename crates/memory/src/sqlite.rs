//! SQLite store for PIN records and messages.
//!
//! Uses a single SQLite database with two tables:
//! - `pins`: provisioned PIN records, unique by hash
//! - `messages`: every user and AI turn, keyed to `pins.id`
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so lexical order equals chronological order. The
//! `seq` column breaks timestamp ties in insertion order.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pinchat_core::error::StoreError;
use pinchat_core::identity::{IdentityId, PinRecord};
use pinchat_core::message::{Message, Sender};
use pinchat_core::store::{MessageStore, PinStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// SQLite-backed [`PinStore`] and [`MessageStore`].
pub struct SqliteStore {
    pool: SqlitePool,
}

fn pool_options(in_memory: bool, max_connections: u32) -> SqlitePoolOptions {
    if in_memory {
        // Closing the last connection drops the database and its tables.
        return SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    SqlitePoolOptions::new().max_connections(max_connections.max(1))
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database. An in-memory
    /// database lives only as long as its connection, so the pool holds
    /// exactly one that is never reaped.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = pool_options(in_memory, max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!(url = %redact_url(url), "SQLite store initialized");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pins (
                id          TEXT PRIMARY KEY NOT NULL,
                pin_hash    TEXT UNIQUE NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("pins table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT UNIQUE NOT NULL,
                pin_id      TEXT NOT NULL REFERENCES pins(id),
                sender      TEXT NOT NULL CHECK (sender IN ('user', 'ai')),
                text        TEXT NOT NULL,
                timestamp   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_pin_time ON messages(pin_id, timestamp, seq)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PinRecord, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let pin_hash: String = row
            .try_get("pin_hash")
            .map_err(|e| StoreError::QueryFailed(format!("pin_hash column: {e}")))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        Ok(PinRecord {
            id: IdentityId(id),
            pin_hash,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let pin_id: String = row
            .try_get("pin_id")
            .map_err(|e| StoreError::QueryFailed(format!("pin_id column: {e}")))?;
        let sender: String = row
            .try_get("sender")
            .map_err(|e| StoreError::QueryFailed(format!("sender column: {e}")))?;
        let text: String = row
            .try_get("text")
            .map_err(|e| StoreError::QueryFailed(format!("text column: {e}")))?;
        let timestamp: String = row
            .try_get("timestamp")
            .map_err(|e| StoreError::QueryFailed(format!("timestamp column: {e}")))?;

        Ok(Message {
            id,
            identity: IdentityId(pin_id),
            sender: Sender::from_str(&sender).map_err(StoreError::QueryFailed)?,
            text,
            timestamp: parse_timestamp(&timestamp)?,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

fn insert_error(what: &str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(format!("{what} already exists"))
        }
        _ => StoreError::Storage(format!("INSERT {what} failed: {e}")),
    }
}

/// Strip any query string (which may carry credentials) before logging.
fn redact_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[async_trait]
impl PinStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn all(&self) -> Result<Vec<PinRecord>, StoreError> {
        let rows = sqlx::query("SELECT id, pin_hash, created_at FROM pins ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT pins: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn insert(&self, record: PinRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO pins (id, pin_hash, created_at) VALUES (?1, ?2, ?3)")
            .bind(record.id.as_str())
            .bind(&record.pin_hash)
            .bind(format_timestamp(&record.created_at))
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error("PIN record", e))?;

        debug!(identity = %record.id, "Stored PIN record");
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM pins")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT pins: {e}")))?;
        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, pin_id, sender, text, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&message.id)
        .bind(message.identity.as_str())
        .bind(message.sender.as_str())
        .bind(&message.text)
        .bind(format_timestamp(&message.timestamp))
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("message", e))?;

        Ok(())
    }

    async fn newest(
        &self,
        identity: &IdentityId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, pin_id, sender, text, timestamp FROM messages
            WHERE pin_id = ?1
            ORDER BY timestamp DESC, seq DESC
            LIMIT ?2
            "#,
        )
        .bind(identity.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("SELECT newest messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn all_for(&self, identity: &IdentityId) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, pin_id, sender, text, timestamp FROM messages
            WHERE pin_id = ?1
            ORDER BY timestamp ASC, seq ASC
            "#,
        )
        .bind(identity.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("SELECT messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }
}
