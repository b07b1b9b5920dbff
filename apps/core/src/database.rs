use crate::models::{InteractionRecord, LabelCount, TrainingExample};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const CREATE_INTENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS intents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tag TEXT NOT NULL CHECK (length(tag) > 0),
        pattern TEXT NOT NULL CHECK (length(pattern) > 0),
        response TEXT NOT NULL CHECK (length(response) > 0)
    )
"#;

const CREATE_INTENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_intents_tag_id ON intents (tag, id)";

const CREATE_CONVERSATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_input TEXT NOT NULL,
        predicted_intent TEXT NOT NULL,
        bot_response TEXT NOT NULL,
        confidence REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
        timestamp INTEGER NOT NULL
    )
"#;

/// Opens a pool on `db_url` (creating the file if missing) and applies the schema.
pub async fn init_db(db_url: &str, acquire_timeout: Duration) -> Result<SqlitePool, sqlx::Error> {
    info!("Initializing database at: {}", db_url);

    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;
    Ok(pool)
}

/// Creates both tables. Safe to run repeatedly.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in [CREATE_INTENTS, CREATE_INTENTS_INDEX, CREATE_CONVERSATIONS] {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

// --- Intents ---

/// Inserts one example inside its own transaction and returns the new id.
pub async fn insert_intent(
    pool: &SqlitePool,
    tag: &str,
    pattern: &str,
    response: &str,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("INSERT INTO intents (tag, pattern, response) VALUES (?, ?, ?)")
        .bind(tag)
        .bind(pattern)
        .bind(response)
        .execute(&mut *tx)
        .await;

    match result {
        Ok(done) => {
            tx.commit().await?;
            Ok(done.last_insert_rowid())
        }
        Err(e) => {
            let _ = tx.rollback().await;
            Err(e)
        }
    }
}

pub async fn get_all_intents(pool: &SqlitePool) -> Result<Vec<TrainingExample>, sqlx::Error> {
    sqlx::query_as::<_, TrainingExample>(
        r#"
        SELECT id, tag, pattern, response
        FROM intents
        ORDER BY tag, id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn clear_intents(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let done = sqlx::query("DELETE FROM intents").execute(pool).await?;
    Ok(done.rows_affected())
}

pub async fn count_intents_by_tag(pool: &SqlitePool) -> Result<Vec<LabelCount>, sqlx::Error> {
    sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT tag, COUNT(*) AS count
        FROM intents
        GROUP BY tag
        ORDER BY tag
        "#,
    )
    .fetch_all(pool)
    .await
}

// --- Conversations ---

/// Appends one interaction inside a transaction; rolled back on failure.
pub async fn insert_conversation(
    pool: &SqlitePool,
    record: &InteractionRecord,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO conversations (user_input, predicted_intent, bot_response, confidence, timestamp)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.input)
    .bind(&record.predicted_label)
    .bind(&record.response)
    .bind(record.confidence)
    .bind(record.timestamp)
    .execute(&mut *tx)
    .await;

    match result {
        Ok(_) => tx.commit().await,
        Err(e) => {
            let _ = tx.rollback().await;
            Err(e)
        }
    }
}

pub async fn count_conversations(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
