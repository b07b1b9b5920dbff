//! # IntentBot Core
//!
//! Closed-domain intent classification: normalize -> TF-IDF -> Naive Bayes ->
//! response template, with training examples and interaction history kept in
//! SQLite.
//!
//! ```rust,ignore
//! let config = AppConfig::from_env()?;
//! let pipeline = IntentPipeline::connect(&config, Arc::new(EnglishNormalizer::new())).await?;
//! pipeline.load_training_data().await?;
//! pipeline.train()?;
//! let reply = pipeline.predict_and_respond("hello there").await?;
//! ```

pub mod brain;
pub mod config;
pub mod database;
pub mod error;
pub mod fs_manager;
pub mod models;
pub mod pipeline;
pub mod seed;
pub mod store;

#[cfg(test)]
mod tests;

pub use brain::{EnglishNormalizer, Prediction, TextNormalizer};
pub use config::AppConfig;
pub use error::AppError;
pub use models::{InteractionRecord, TrainingExample};
pub use pipeline::{IntentPipeline, PipelineState, Reply, Snapshot};
