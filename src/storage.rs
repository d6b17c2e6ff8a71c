use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::broadcast;

/// Capacity of the change-event channel. Subscribers that lag past this many
/// events see a `Lagged` error and resync by re-reading the store.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A key was written or cleared. Carries the touched key so subscribers can
/// decide whether they care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Updated { key: String },
    Cleared { key: String },
}

/// Durable key-value store for all tracker state.
///
/// Values are JSON text owned by the individual stores (history, overrides,
/// profile, points); this layer only moves strings. Every successful mutation
/// publishes a [`StoreEvent`]; dropping the receiver returned by
/// [`Storage::subscribe`] is the unsubscribe.
#[derive(Clone)]
pub struct Storage {
    pool: Arc<SqlitePool>,
    events: broadcast::Sender<StoreEvent>,
    #[allow(dead_code)]
    path: PathBuf,
}

impl Storage {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path_buf)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| "failed to connect to sqlite database")?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            pool: Arc::new(pool),
            events,
            path: path_buf,
        })
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&*self.pool)
        .await
        .with_context(|| "failed to ensure kv_store schema")?;

        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query(r#"SELECT value FROM kv_store WHERE key = ?"#)
            .bind(key)
            .fetch_optional(&*self.pool)
            .await
            .with_context(|| format!("failed to read key {key}"))?;

        match row {
            Some(row) => {
                let value: String = row
                    .try_get("value")
                    .with_context(|| format!("failed to decode value for key {key}"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .with_context(|| format!("failed to write key {key}"))?;

        self.publish(StoreEvent::Updated {
            key: key.to_string(),
        });
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM kv_store WHERE key = ?"#)
            .bind(key)
            .execute(&*self.pool)
            .await
            .with_context(|| format!("failed to delete key {key}"))?;

        self.publish(StoreEvent::Cleared {
            key: key.to_string(),
        });
        Ok(())
    }

    /// Subscribes to change events. The receiver is the unsubscribe handle:
    /// drop it and the registration goes away with it.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: StoreEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.events.send(event);
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
