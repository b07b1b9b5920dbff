//! Pipeline Tests
//!
//! End-to-end behaviour of `IntentPipeline`: load, train, predict, respond, log.

use crate::brain::normalizer::EnglishNormalizer;
use crate::config::{sqlite_url_for, AppConfig};
use crate::database;
use crate::error::AppError;
use crate::pipeline::{IntentPipeline, PipelineState};
use crate::store::memory::{InMemoryExampleStore, InMemoryInteractionLog};
use crate::store::sqlite::SqliteExampleStore;
use crate::store::traits::ExampleStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

const GREET_BYE: &[(&str, &str, &str)] = &[
    ("greet", "hello", "Hi!"),
    ("greet", "hi there", "Hi!"),
    ("bye", "goodbye", "See you!"),
    ("bye", "see you later", "See you!"),
];

fn in_memory(
    examples: &[(&str, &str, &str)],
) -> (IntentPipeline, Arc<InMemoryExampleStore>, Arc<InMemoryInteractionLog>) {
    let store = Arc::new(InMemoryExampleStore::with_examples(examples));
    let log = Arc::new(InMemoryInteractionLog::new());
    let pipeline = IntentPipeline::new(store.clone(), log.clone(), Arc::new(EnglishNormalizer::new()))
        .with_rng(StdRng::seed_from_u64(42));
    (pipeline, store, log)
}

async fn trained(examples: &[(&str, &str, &str)]) -> (IntentPipeline, Arc<InMemoryExampleStore>, Arc<InMemoryInteractionLog>) {
    let (pipeline, store, log) = in_memory(examples);
    pipeline.load_training_data().await.unwrap();
    pipeline.train().unwrap();
    (pipeline, store, log)
}

#[cfg(test)]
mod in_memory_tests {
    use super::*;

    #[tokio::test]
    async fn test_greet_bye_end_to_end() {
        let (pipeline, _store, log) = trained(GREET_BYE).await;

        let prediction = pipeline.predict_intent("hello there").unwrap();
        assert_eq!(prediction.label, "greet");
        assert!(prediction.confidence > 0.5);
        assert_eq!(pipeline.get_response("greet"), "Hi!");

        let reply = pipeline.predict_and_respond("goodbye!").await.unwrap();
        assert_eq!(reply.label, "bye");
        assert_eq!(reply.response, "See you!");
        assert!(!reply.fallback);
        assert!(reply.logged);

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input, "goodbye!");
        assert_eq!(records[0].predicted_label, "bye");
        assert_eq!(records[0].response, "See you!");
        assert_eq!(records[0].confidence, reply.confidence);
    }

    #[tokio::test]
    async fn test_minimal_greet_bye_seed() {
        let (pipeline, _store, _log) = trained(&[
            ("greet", "hello", "Hi!"),
            ("greet", "hi", "Hi!"),
            ("bye", "bye", "See you!"),
            ("bye", "goodbye", "See you!"),
        ])
        .await;

        let prediction = pipeline.predict_intent("hello there").unwrap();
        assert_eq!(prediction.label, "greet");
        assert!(
            (prediction.confidence - 0.77).abs() < 0.01,
            "Unexpected confidence {}",
            prediction.confidence
        );
        assert_eq!(pipeline.get_response("greet"), "Hi!");
        assert_eq!(pipeline.get_response("bye"), "See you!");
    }

    #[tokio::test]
    async fn test_single_label_always_certain() {
        let (pipeline, _store, _log) = trained(&[
            ("greet", "hello", "Hi!"),
            ("greet", "hey", "Hey!"),
        ])
        .await;

        for input in ["hello", "what is the weather", "", "!!!"] {
            let prediction = pipeline.predict_intent(input).unwrap();
            assert_eq!(prediction.label, "greet", "Expected greet for '{}'", input);
            assert_eq!(prediction.confidence, 1.0);
        }
    }

    #[tokio::test]
    async fn test_predictions_are_repeatable() {
        let (pipeline, _store, _log) = trained(GREET_BYE).await;
        for input in ["hello", "see you", "umbrella weather", ""] {
            let first = pipeline.predict_intent(input).unwrap();
            let second = pipeline.predict_intent(input).unwrap();
            assert_eq!(first, second, "Prediction changed for '{}'", input);
        }
    }

    #[tokio::test]
    async fn test_response_comes_from_label_templates() {
        let (pipeline, _store, _log) = trained(&[
            ("greet", "hello", "Hi!"),
            ("greet", "hey", "Hey there!"),
            ("greet", "good morning", "Morning!"),
            ("bye", "goodbye", "Bye!"),
        ])
        .await;

        let templates = ["Hi!", "Hey there!", "Morning!"];
        for _ in 0..20 {
            let response = pipeline.get_response("greet");
            assert!(templates.contains(&response.as_str()), "Unexpected response '{}'", response);
        }
    }

    #[tokio::test]
    async fn test_unknown_label_gets_fallback() {
        let (pipeline, _store, _log) = trained(GREET_BYE).await;
        assert_eq!(
            pipeline.get_response("weather"),
            "I'm not sure how to help with that."
        );

        let (pipeline, _store, _log) = in_memory(GREET_BYE);
        let pipeline = pipeline.with_fallback_response("Sorry?");
        pipeline.load_training_data().await.unwrap();
        pipeline.train().unwrap();
        assert_eq!(pipeline.get_response("weather"), "Sorry?");
    }

    #[tokio::test]
    async fn test_failing_log_does_not_block_reply() {
        let store = Arc::new(InMemoryExampleStore::with_examples(GREET_BYE));
        let log = Arc::new(InMemoryInteractionLog::failing());
        let pipeline = IntentPipeline::new(store, log.clone(), Arc::new(EnglishNormalizer::new()));
        pipeline.load_training_data().await.unwrap();
        pipeline.train().unwrap();

        let reply = pipeline.predict_and_respond("hello").await.unwrap();
        assert_eq!(reply.label, "greet");
        assert_eq!(reply.response, "Hi!");
        assert!(!reply.logged);
        assert!(!pipeline.log_conversation("hello", "greet", "Hi!", 0.9).await);

        log.set_failing(false);
        let reply = pipeline.predict_and_respond("hello").await.unwrap();
        assert!(reply.logged);
        assert_eq!(log.records().len(), 1);
    }

    #[tokio::test]
    async fn test_logging_can_be_disabled() {
        let config = AppConfig {
            log_interactions: false,
            ..AppConfig::default()
        };
        let (pipeline, _store, log) = in_memory(GREET_BYE);
        let pipeline = pipeline.with_config(&config);
        pipeline.load_training_data().await.unwrap();
        pipeline.train().unwrap();

        let reply = pipeline.predict_and_respond("hello").await.unwrap();
        assert_eq!(reply.label, "greet");
        assert!(!reply.logged);
        assert!(log.records().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_serving() {
        let (pipeline, store, _log) = trained(GREET_BYE).await;
        let before = pipeline.snapshot().unwrap();

        store.set_offline(true);
        let result = pipeline.load_training_data().await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
        assert_eq!(pipeline.state(), PipelineState::Trained);
        assert!(Arc::ptr_eq(&before, &pipeline.snapshot().unwrap()));
        assert_eq!(pipeline.predict_intent("hello").unwrap().label, "greet");

        store.set_offline(false);
        store.clear().await.unwrap();
        assert!(matches!(
            pipeline.load_training_data().await,
            Err(AppError::EmptyTrainingSet)
        ));
        assert_eq!(pipeline.predict_intent("goodbye").unwrap().label, "bye");
    }

    #[tokio::test]
    async fn test_retrain_picks_up_new_examples() {
        let (pipeline, store, _log) = trained(GREET_BYE).await;
        assert_eq!(pipeline.get_response("weather"), "I'm not sure how to help with that.");

        store
            .insert("weather", "is it raining", "Take an umbrella.")
            .await
            .unwrap();
        // New rows are invisible until the next load + train.
        assert_eq!(pipeline.snapshot().unwrap().example_count, 4);

        assert_eq!(pipeline.load_training_data().await.unwrap(), 5);
        let summary = pipeline.train().unwrap();
        assert_eq!(summary.examples, 5);
        assert_eq!(summary.labels, 3);

        let reply = pipeline.predict_and_respond("raining again?").await.unwrap();
        assert_eq!(reply.label, "weather");
        assert_eq!(reply.response, "Take an umbrella.");
    }

    #[tokio::test]
    async fn test_untrained_pipeline_refuses_requests() {
        let (pipeline, _store, _log) = in_memory(GREET_BYE);
        assert!(matches!(
            pipeline.predict_and_respond("hello").await,
            Err(AppError::NotTrained)
        ));
    }
}

#[cfg(test)]
mod sqlite_tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn seeded_config(dir: &tempfile::TempDir) -> AppConfig {
        let path = dir.path().join("pipeline.sqlite");
        let config = AppConfig {
            database_url: sqlite_url_for(path.to_str().unwrap()),
            ..AppConfig::default()
        };

        let store = SqliteExampleStore::connect(&config.database_url, TIMEOUT)
            .await
            .unwrap();
        for (label, pattern, response) in GREET_BYE {
            store.insert(label, pattern, response).await.unwrap();
        }
        store.close().await;
        config
    }

    #[tokio::test]
    async fn test_sqlite_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(&dir).await;

        let pipeline = IntentPipeline::connect(&config, Arc::new(EnglishNormalizer::new()))
            .await
            .unwrap();
        assert_eq!(pipeline.load_training_data().await.unwrap(), 4);
        pipeline.train().unwrap();

        let reply = pipeline.predict_and_respond("hello there").await.unwrap();
        assert_eq!(reply.label, "greet");
        assert_eq!(reply.response, "Hi!");
        assert!(reply.logged);

        let reply = pipeline.predict_and_respond("see you").await.unwrap();
        assert_eq!(reply.label, "bye");
        pipeline.close().await;

        let pool = database::init_db(&config.database_url, TIMEOUT).await.unwrap();
        assert_eq!(database::count_conversations(&pool).await.unwrap(), 2);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_broken_log_table_does_not_block_reply() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(&dir).await;

        let pipeline = IntentPipeline::connect(&config, Arc::new(EnglishNormalizer::new()))
            .await
            .unwrap();
        pipeline.load_training_data().await.unwrap();
        pipeline.train().unwrap();

        let pool = database::init_db(&config.database_url, TIMEOUT).await.unwrap();
        sqlx::query("DROP TABLE conversations")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let reply = pipeline.predict_and_respond("goodbye").await.unwrap();
        assert_eq!(reply.label, "bye");
        assert_eq!(reply.response, "See you!");
        assert!(!reply.logged);
        pipeline.close().await;
    }

    #[tokio::test]
    async fn test_empty_database_is_empty_training_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite");
        let config = AppConfig {
            database_url: sqlite_url_for(path.to_str().unwrap()),
            ..AppConfig::default()
        };

        let pipeline = IntentPipeline::connect(&config, Arc::new(EnglishNormalizer::new()))
            .await
            .unwrap();
        assert!(matches!(
            pipeline.load_training_data().await,
            Err(AppError::EmptyTrainingSet)
        ));
        assert_eq!(pipeline.state(), PipelineState::Unloaded);
        pipeline.close().await;
    }
}
