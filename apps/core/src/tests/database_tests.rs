//! Database Tests
//!
//! SQLite example store and interaction log against real database files.

use crate::config::sqlite_url_for;
use crate::database;
use crate::error::AppError;
use crate::models::InteractionRecord;
use crate::store::sqlite::{SqliteExampleStore, SqliteInteractionLog};
use crate::store::traits::{ExampleStore, InteractionLog};
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Temp directory plus a database URL inside it. Keep the directory alive for the test.
fn temp_db() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("intentbot-test.sqlite");
    let url = sqlite_url_for(path.to_str().expect("utf-8 temp path"));
    (dir, url)
}

#[cfg(test)]
mod example_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let (_dir, url) = temp_db();
        let pool = database::init_db(&url, TIMEOUT).await.unwrap();
        database::apply_schema(&pool).await.unwrap();
        database::apply_schema(&pool).await.unwrap();
        assert!(database::get_all_intents(&pool).await.unwrap().is_empty());
        pool.close().await;
    }

    #[tokio::test]
    async fn test_all_ordered_by_label_then_id() {
        let (_dir, url) = temp_db();
        let store = SqliteExampleStore::connect(&url, TIMEOUT).await.unwrap();

        let first = store.insert("greet", "hello", "Hi!").await.unwrap();
        let second = store.insert("bye", "goodbye", "See you!").await.unwrap();
        let third = store.insert("greet", "hey", "Hey!").await.unwrap();
        assert!(first < second && second < third, "ids must increase");

        let rows = store.all().await.unwrap();
        let order: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.label.as_str(), r.pattern.as_str()))
            .collect();
        assert_eq!(order, vec![("bye", "goodbye"), ("greet", "hello"), ("greet", "hey")]);
        assert_eq!(rows[0].response, "See you!");

        store.close().await;
    }

    #[tokio::test]
    async fn test_rejected_insert_leaves_no_row() {
        let (_dir, url) = temp_db();
        let store = SqliteExampleStore::connect(&url, TIMEOUT).await.unwrap();
        store.insert("greet", "hello", "Hi!").await.unwrap();

        let result = store.insert("", "orphan", "nobody").await;
        assert!(
            matches!(result, Err(AppError::PersistenceFailure(_))),
            "Expected PersistenceFailure, got {:?}",
            result
        );

        let rows = store.all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pattern, "hello");
        store.close().await;
    }

    #[tokio::test]
    async fn test_clear_and_label_counts() {
        let (_dir, url) = temp_db();
        let store = SqliteExampleStore::connect(&url, TIMEOUT).await.unwrap();
        for (label, pattern) in [("greet", "hello"), ("greet", "hi"), ("bye", "bye")] {
            store.insert(label, pattern, "ok").await.unwrap();
        }

        let counts: Vec<(String, i64)> = store
            .label_counts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.label, c.count))
            .collect();
        assert_eq!(counts, vec![("bye".to_string(), 1), ("greet".to_string(), 2)]);

        assert_eq!(store.clear().await.unwrap(), 3);
        assert!(store.all().await.unwrap().is_empty());
        assert!(store.label_counts().await.unwrap().is_empty());
        store.close().await;
    }

    #[tokio::test]
    async fn test_examples_survive_reconnect() {
        let (_dir, url) = temp_db();
        {
            let store = SqliteExampleStore::connect(&url, TIMEOUT).await.unwrap();
            store.insert("weather", "is it raining", "Bring an umbrella").await.unwrap();
            store.close().await;
        }

        let store = SqliteExampleStore::connect(&url, TIMEOUT).await.unwrap();
        let rows = store.all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "weather");
        store.close().await;
    }

    #[tokio::test]
    async fn test_store_over_existing_pool() {
        let (_dir, url) = temp_db();
        let pool = database::init_db(&url, TIMEOUT).await.unwrap();
        database::insert_intent(&pool, "greet", "hello", "Hi!").await.unwrap();

        let store = SqliteExampleStore::from_pool(pool.clone(), TIMEOUT);
        store.insert("bye", "goodbye", "See you!").await.unwrap();

        let labels: Vec<String> = store.all().await.unwrap().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["bye", "greet"]);
        assert_eq!(database::get_all_intents(&pool).await.unwrap().len(), 2);

        store.close().await;
        assert!(pool.is_closed());
    }
}

#[cfg(test)]
mod interaction_log_tests {
    use super::*;

    #[tokio::test]
    async fn test_append_is_durable() {
        let (_dir, url) = temp_db();
        let log = SqliteInteractionLog::connect(&url, TIMEOUT).await.unwrap();

        log.append(&InteractionRecord::now("hello", "greet", "Hi!", 0.9))
            .await
            .unwrap();
        log.append(&InteractionRecord::now("bye", "bye", "See you!", 1.0))
            .await
            .unwrap();
        log.close().await;

        let pool = database::init_db(&url, TIMEOUT).await.unwrap();
        assert_eq!(database::count_conversations(&pool).await.unwrap(), 2);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_rejected() {
        let (_dir, url) = temp_db();
        let log = SqliteInteractionLog::connect(&url, TIMEOUT).await.unwrap();

        for confidence in [-0.1, 1.5, f64::NAN] {
            let result = log
                .append(&InteractionRecord::now("hi", "greet", "Hi!", confidence))
                .await;
            assert!(
                matches!(result, Err(AppError::PersistenceFailure(_))),
                "Expected PersistenceFailure for confidence {}",
                confidence
            );
        }
        log.close().await;

        let pool = database::init_db(&url, TIMEOUT).await.unwrap();
        assert_eq!(database::count_conversations(&pool).await.unwrap(), 0);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_reconnects_once_after_close() {
        let (_dir, url) = temp_db();
        let log = SqliteInteractionLog::connect(&url, TIMEOUT).await.unwrap();
        log.append(&InteractionRecord::now("hello", "greet", "Hi!", 0.8))
            .await
            .unwrap();
        assert_eq!(log.reconnect_attempts(), 0);

        log.close().await;
        log.append(&InteractionRecord::now("hello again", "greet", "Hi!", 0.8))
            .await
            .unwrap();
        assert_eq!(log.reconnect_attempts(), 1);

        log.append(&InteractionRecord::now("still here", "greet", "Hi!", 0.8))
            .await
            .unwrap();
        assert_eq!(log.reconnect_attempts(), 1);
        log.close().await;

        let pool = database::init_db(&url, TIMEOUT).await.unwrap();
        assert_eq!(database::count_conversations(&pool).await.unwrap(), 3);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_unreachable_log_fails_each_append() {
        let url = "sqlite:///nonexistent-dir-for-intentbot/sub/log.sqlite";
        let log = SqliteInteractionLog::lazy(url, Duration::from_secs(2));
        let record = InteractionRecord::now("hello", "greet", "Hi!", 0.5);

        for attempt in 1..=2 {
            let result = log.append(&record).await;
            assert!(
                matches!(result, Err(AppError::StoreUnavailable(_))),
                "Expected StoreUnavailable, got {:?}",
                result
            );
            assert_eq!(log.reconnect_attempts(), attempt);
        }
    }
}
