//! Pipeline orchestrator: `load -> train -> predict -> respond -> log`.
//!
//! The trained state lives in one immutable [`Snapshot`] behind an `Arc`.
//! Requests clone the `Arc` once and finish against it, so a concurrent
//! retrain can never hand them a model from one cycle and responses from
//! another.

use crate::brain::classifier::{self, ClassModel, Prediction};
use crate::brain::normalizer::TextNormalizer;
use crate::brain::responses::{self, ResponseTable};
use crate::brain::vectorizer::{self, Vocabulary};
use crate::config::{AppConfig, DEFAULT_FALLBACK_RESPONSE, DEFAULT_STORE_TIMEOUT_MS};
use crate::error::AppError;
use crate::models::{InteractionRecord, TrainingExample};
use crate::store::sqlite::{SqliteExampleStore, SqliteInteractionLog};
use crate::store::traits::{ExampleStore, InteractionLog};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of a pipeline. `Trained` is also the serving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Unloaded,
    Loaded,
    Trained,
}

/// Vocabulary, model and responses from one training cycle.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub vocabulary: Vocabulary,
    pub model: ClassModel,
    pub responses: ResponseTable,
    pub example_count: usize,
    pub trained_at: DateTime<Utc>,
}

impl Snapshot {
    /// Normalizes every pattern, then fits vocabulary, model and response table in that order.
    pub fn build(
        examples: &[TrainingExample],
        normalizer: &dyn TextNormalizer,
        alpha: f64,
    ) -> Result<Self, AppError> {
        let corpus: Vec<String> = examples
            .iter()
            .map(|e| normalizer.normalize_to_text(&e.pattern))
            .collect();
        let labels: Vec<&str> = examples.iter().map(|e| e.label.as_str()).collect();

        let vocabulary = vectorizer::fit(&corpus)?;
        let vectors: Vec<Vec<f64>> = corpus
            .iter()
            .map(|text| vectorizer::transform(text, &vocabulary))
            .collect();
        let model = classifier::fit(&vectors, &labels, alpha)?;
        let responses = ResponseTable::from_examples(examples);

        Ok(Self {
            vocabulary,
            model,
            responses,
            example_count: examples.len(),
            trained_at: Utc::now(),
        })
    }

    pub fn classify(&self, normalizer: &dyn TextNormalizer, text: &str) -> Result<Prediction, AppError> {
        let normalized = normalizer.normalize_to_text(text);
        let vector = vectorizer::transform(&normalized, &self.vocabulary);
        self.model.predict(&vector)
    }
}

/// Outcome of one `train()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingSummary {
    pub examples: usize,
    pub labels: usize,
    pub vocabulary_size: usize,
}

/// Everything a caller needs to answer one user input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub label: String,
    pub confidence: f64,
    pub response: String,
    /// The label had no templates and the fallback text was used.
    pub fallback: bool,
    /// Whether the interaction log accepted the record.
    pub logged: bool,
}

pub struct IntentPipeline {
    examples: Arc<dyn ExampleStore>,
    interactions: Arc<dyn InteractionLog>,
    normalizer: Arc<dyn TextNormalizer>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    fallback_response: String,
    alpha: f64,
    store_timeout: Duration,
    log_interactions: bool,
    loaded: RwLock<Option<Arc<Vec<TrainingExample>>>>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl IntentPipeline {
    /// Creates an unloaded pipeline over the given capabilities, with default settings
    /// and an entropy-seeded random source.
    pub fn new(
        examples: Arc<dyn ExampleStore>,
        interactions: Arc<dyn InteractionLog>,
        normalizer: Arc<dyn TextNormalizer>,
    ) -> Self {
        Self {
            examples,
            interactions,
            normalizer,
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
            fallback_response: DEFAULT_FALLBACK_RESPONSE.to_string(),
            alpha: 1.0,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            log_interactions: true,
            loaded: RwLock::new(None),
            snapshot: RwLock::new(None),
        }
    }

    /// Opens both SQLite stores described by `config`.
    ///
    /// The example store must be reachable. The interaction log is optional:
    /// if it can't connect now, it will try again on the first append.
    pub async fn connect(
        config: &AppConfig,
        normalizer: Arc<dyn TextNormalizer>,
    ) -> Result<Self, AppError> {
        let limit = config.store_timeout();
        let examples = SqliteExampleStore::connect(&config.database_url, limit).await?;
        let interactions = match SqliteInteractionLog::connect(&config.database_url, limit).await {
            Ok(log) => log,
            Err(e) => {
                warn!("Interaction log unavailable, will retry on first write: {}", e);
                SqliteInteractionLog::lazy(&config.database_url, limit)
            }
        };

        Ok(Self::new(Arc::new(examples), Arc::new(interactions), normalizer).with_config(config))
    }

    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.fallback_response = config.fallback_response.clone();
        self.alpha = config.smoothing_alpha;
        self.store_timeout = config.store_timeout();
        self.log_interactions = config.log_interactions;
        self
    }

    /// Replaces the random source used for response selection.
    pub fn with_rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    pub fn with_fallback_response(mut self, text: &str) -> Self {
        self.fallback_response = text.to_string();
        self
    }

    pub fn state(&self) -> PipelineState {
        if read(&self.snapshot).is_some() {
            PipelineState::Trained
        } else if read(&self.loaded).is_some() {
            PipelineState::Loaded
        } else {
            PipelineState::Unloaded
        }
    }

    /// The snapshot currently serving requests.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, AppError> {
        read(&self.snapshot).clone().ok_or(AppError::NotTrained)
    }

    /// Reads every example from the store. Returns how many were loaded.
    ///
    /// On failure nothing changes: a serving pipeline keeps its current snapshot.
    #[instrument(skip(self))]
    pub async fn load_training_data(&self) -> Result<usize, AppError> {
        info!("Loading training data...");
        let examples = self.bounded(self.examples.all()).await.map_err(|e| {
            warn!("Failed to load training data: {}", e);
            e
        })?;

        if examples.is_empty() {
            warn!("No training data found");
            return Err(AppError::EmptyTrainingSet);
        }

        let mut distribution: BTreeMap<&str, usize> = BTreeMap::new();
        for example in &examples {
            *distribution.entry(example.label.as_str()).or_insert(0) += 1;
        }
        info!(
            "Loaded {} training examples across {} intents",
            examples.len(),
            distribution.len()
        );
        for (label, count) in &distribution {
            debug!("  {}: {} examples", label, count);
        }

        let count = examples.len();
        *write(&self.loaded) = Some(Arc::new(examples));
        Ok(count)
    }

    /// Fits a new snapshot from the loaded examples and swaps it in.
    #[instrument(skip(self))]
    pub fn train(&self) -> Result<TrainingSummary, AppError> {
        let examples = read(&self.loaded).clone().ok_or(AppError::NotLoaded)?;

        let snapshot = Snapshot::build(&examples, self.normalizer.as_ref(), self.alpha)?;
        let summary = TrainingSummary {
            examples: snapshot.example_count,
            labels: snapshot.model.labels().len(),
            vocabulary_size: snapshot.vocabulary.len(),
        };

        *write(&self.snapshot) = Some(Arc::new(snapshot));
        info!(
            "Model trained: {} examples, {} intents, {} terms",
            summary.examples, summary.labels, summary.vocabulary_size
        );
        Ok(summary)
    }

    /// Classifies `text` against the current snapshot.
    pub fn predict_intent(&self, text: &str) -> Result<Prediction, AppError> {
        self.snapshot()?.classify(self.normalizer.as_ref(), text)
    }

    /// A response for `label` from the current snapshot, or the fallback text.
    pub fn get_response(&self, label: &str) -> String {
        match read(&self.snapshot).clone() {
            Some(snapshot) => self.select_from(&snapshot, label).0,
            None => self.fallback_response.clone(),
        }
    }

    /// Appends one record to the interaction log. Failures are reported and swallowed.
    pub async fn log_conversation(
        &self,
        input: &str,
        label: &str,
        response: &str,
        confidence: f64,
    ) -> bool {
        let record = InteractionRecord::now(input, label, response, confidence);
        match self.bounded(self.interactions.append(&record)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not log conversation: {}", e);
                false
            }
        }
    }

    /// Classifies, picks a response and logs, all against a single snapshot.
    #[instrument(skip(self, input))]
    pub async fn predict_and_respond(&self, input: &str) -> Result<Reply, AppError> {
        let snapshot = self.snapshot()?;
        let prediction = snapshot.classify(self.normalizer.as_ref(), input)?;
        let (response, fallback) = self.select_from(&snapshot, &prediction.label);

        let logged = if self.log_interactions {
            self.log_conversation(input, &prediction.label, &response, prediction.confidence)
                .await
        } else {
            false
        };

        debug!(
            "Intent: {} ({:.2}){}",
            prediction.label,
            prediction.confidence,
            if fallback { " [fallback]" } else { "" }
        );

        Ok(Reply {
            label: prediction.label,
            confidence: prediction.confidence,
            response,
            fallback,
            logged,
        })
    }

    /// Releases both store connections.
    pub async fn close(&self) {
        self.examples.close().await;
        self.interactions.close().await;
        info!("Pipeline closed");
    }

    fn select_from(&self, snapshot: &Snapshot, label: &str) -> (String, bool) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let selected = responses::select(
            label,
            &snapshot.responses,
            &self.fallback_response,
            rng.as_mut(),
        );
        if selected.is_fallback() {
            debug!("No response templates for '{}', using fallback", label);
        }
        (selected.as_str().to_string(), selected.is_fallback())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        timeout(self.store_timeout, fut).await?
    }
}

fn read<T: Clone>(lock: &RwLock<Option<T>>) -> Option<T> {
    lock.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::normalizer::EnglishNormalizer;
    use crate::store::memory::{InMemoryExampleStore, InMemoryInteractionLog};

    fn pipeline(examples: &[(&str, &str, &str)]) -> IntentPipeline {
        IntentPipeline::new(
            Arc::new(InMemoryExampleStore::with_examples(examples)),
            Arc::new(InMemoryInteractionLog::new()),
            Arc::new(EnglishNormalizer::new()),
        )
        .with_rng(StdRng::seed_from_u64(3))
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let pipeline = pipeline(&[("greet", "hello", "Hi!")]);
        assert_eq!(pipeline.state(), PipelineState::Unloaded);
        assert!(matches!(pipeline.train(), Err(AppError::NotLoaded)));
        assert!(matches!(pipeline.predict_intent("hello"), Err(AppError::NotTrained)));

        assert_eq!(pipeline.load_training_data().await.unwrap(), 1);
        assert_eq!(pipeline.state(), PipelineState::Loaded);

        pipeline.train().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Trained);
    }

    #[tokio::test]
    async fn test_empty_store_stays_unloaded() {
        let pipeline = pipeline(&[]);
        assert!(matches!(
            pipeline.load_training_data().await,
            Err(AppError::EmptyTrainingSet)
        ));
        assert_eq!(pipeline.state(), PipelineState::Unloaded);
    }

    #[tokio::test]
    async fn test_untrained_response_is_fallback() {
        let pipeline = pipeline(&[("greet", "hello", "Hi!")]).with_fallback_response("Huh?");
        assert_eq!(pipeline.get_response("greet"), "Huh?");
    }

    #[test]
    fn test_snapshot_build_summary() {
        let examples = vec![
            TrainingExample::new(1, "bye", "bye", "See you!"),
            TrainingExample::new(2, "greet", "hello there", "Hi!"),
        ];
        let snapshot = Snapshot::build(&examples, &EnglishNormalizer::new(), 1.0).unwrap();
        assert_eq!(snapshot.example_count, 2);
        assert_eq!(snapshot.model.labels(), &["bye", "greet"]);
        assert_eq!(snapshot.vocabulary.terms(), &["bye", "hello"]);
    }
}
