//! Event persistence backends
//!
//! Both backends keep `session`, `type`, `t` and `frame` as distinguished
//! fields and the rest of the record as an open payload.

use std::path::{Path, PathBuf};

use log::debug;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::events::LogRecord;
use crate::logfile::to_jsonl;
use crate::settings::StoreBackend;

/// Maximum pooled Postgres connections
const MAX_CONNECTIONS: u32 = 5;

const INSERT_EVENT: &str =
    "INSERT INTO game_events (session, type, t, frame, data) VALUES ($1, $2, $3, $4, $5::jsonb)";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),
}

/// Append-only JSONL file, one record per line
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    /// Serializes appends so batches never interleave
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, records: &[LogRecord]) -> Result<(), StoreError> {
        let text = to_jsonl(records)?;
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// `game_events` table, payload as jsonb
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Pool that connects on first use
    pub fn connect_lazy(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    /// Insert a batch in one transaction
    pub async fn insert(&self, records: &[LogRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(INSERT_EVENT)
                .bind(&record.session)
                .bind(&record.kind)
                .bind(record.t)
                .bind(i64::try_from(record.frame).unwrap_or(i64::MAX))
                .bind(Json(&record.data))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Configured persistence backend
#[derive(Debug)]
pub enum EventStore {
    Jsonl(JsonlStore),
    Postgres(PostgresStore),
}

impl EventStore {
    pub fn open(backend: &StoreBackend) -> Result<Self, StoreError> {
        Ok(match backend {
            StoreBackend::Jsonl(path) => EventStore::Jsonl(JsonlStore::new(path)),
            StoreBackend::Postgres(url) => EventStore::Postgres(PostgresStore::connect_lazy(url)?),
        })
    }

    /// Human-readable destination (never includes credentials)
    pub fn describe(&self) -> String {
        match self {
            EventStore::Jsonl(store) => store.path().display().to_string(),
            EventStore::Postgres(_) => "PostgreSQL (game_events)".to_string(),
        }
    }

    pub async fn persist(&self, records: &[LogRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        match self {
            EventStore::Jsonl(store) => store.append(records).await?,
            EventStore::Postgres(store) => store.insert(records).await?,
        }
        debug!("Persisted {} events", records.len());
        Ok(())
    }
}
