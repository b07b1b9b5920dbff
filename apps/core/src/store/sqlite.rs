use crate::database;
use crate::error::AppError;
use crate::models::{InteractionRecord, LabelCount, TrainingExample};
use crate::store::traits::{ExampleStore, InteractionLog};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Runs a store call under `limit`, converting expiry and driver errors into `AppError`.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    Ok(timeout(limit, fut).await??)
}

/// Opening a pool is all-or-nothing: any failure means the store is unavailable.
async fn open_pool(db_url: &str, limit: Duration) -> Result<SqlitePool, AppError> {
    match timeout(limit, database::init_db(db_url, limit)).await {
        Ok(Ok(pool)) => Ok(pool),
        Ok(Err(e)) => Err(AppError::StoreUnavailable(e.to_string())),
        Err(elapsed) => Err(elapsed.into()),
    }
}

/// SQLite-backed example store (`intents` table).
pub struct SqliteExampleStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteExampleStore {
    /// Connects to `db_url`, creating the file and schema if needed.
    pub async fn connect(db_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let pool = open_pool(db_url, timeout).await?;
        info!("Example store connected");
        Ok(Self { pool, timeout })
    }

    /// Wraps an existing pool. The schema must already be applied.
    pub fn from_pool(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl ExampleStore for SqliteExampleStore {
    #[instrument(skip(self, pattern, response))]
    async fn insert(&self, label: &str, pattern: &str, response: &str) -> Result<i64, AppError> {
        let id = bounded(
            self.timeout,
            database::insert_intent(&self.pool, label, pattern, response),
        )
        .await?;
        debug!("Inserted example {} for '{}'", id, label);
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn all(&self) -> Result<Vec<TrainingExample>, AppError> {
        bounded(self.timeout, database::get_all_intents(&self.pool)).await
    }

    async fn clear(&self) -> Result<u64, AppError> {
        bounded(self.timeout, database::clear_intents(&self.pool)).await
    }

    async fn label_counts(&self) -> Result<Vec<LabelCount>, AppError> {
        bounded(self.timeout, database::count_intents_by_tag(&self.pool)).await
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Example store connection closed");
    }
}

/// SQLite-backed interaction log (`conversations` table).
///
/// Holds its own pool. A dropped connection is re-opened at most once per
/// `append`; if that attempt fails the append fails.
pub struct SqliteInteractionLog {
    db_url: String,
    timeout: Duration,
    pool: Mutex<Option<SqlitePool>>,
    reconnects: AtomicU64,
}

impl SqliteInteractionLog {
    /// Connects eagerly.
    pub async fn connect(db_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let pool = open_pool(db_url, timeout).await?;
        info!("Interaction log connected");
        Ok(Self {
            db_url: db_url.to_string(),
            timeout,
            pool: Mutex::new(Some(pool)),
            reconnects: AtomicU64::new(0),
        })
    }

    /// Defers connecting until the first `append`.
    pub fn lazy(db_url: &str, timeout: Duration) -> Self {
        Self {
            db_url: db_url.to_string(),
            timeout,
            pool: Mutex::new(None),
            reconnects: AtomicU64::new(0),
        }
    }

    /// Number of reconnect attempts made so far.
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InteractionLog for SqliteInteractionLog {
    #[instrument(skip(self, record), fields(label = %record.predicted_label))]
    async fn append(&self, record: &InteractionRecord) -> Result<(), AppError> {
        if !record.has_valid_confidence() {
            return Err(AppError::PersistenceFailure(format!(
                "confidence out of range: {}",
                record.confidence
            )));
        }

        let mut guard = self.pool.lock().await;

        let dropped = guard.as_ref().map_or(true, |pool| pool.is_closed());
        if dropped {
            warn!("Interaction log connection lost, reconnecting...");
            self.reconnects.fetch_add(1, Ordering::Relaxed);
            *guard = None;
            *guard = Some(open_pool(&self.db_url, self.timeout).await?);
        }

        let pool = match guard.as_ref() {
            Some(pool) => pool.clone(),
            None => return Err(AppError::StoreUnavailable("no connection".to_string())),
        };

        let result = bounded(self.timeout, database::insert_conversation(&pool, record)).await;
        if let Err(e) = &result {
            if e.is_connection_error() {
                // Next append gets its one reconnect attempt.
                pool.close().await;
                *guard = None;
            }
        }
        result
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            info!("Interaction log connection closed");
        }
    }
}
