//! # Brain Module
//!
//! Pure, in-memory classification components. Nothing here performs I/O.
//!
//! ## Components
//! - `normalizer`: text -> lemma tokens
//! - `vectorizer`: vocabulary + TF-IDF vectors
//! - `classifier`: multinomial Naive Bayes
//! - `responses`: response templates and random selection

pub mod classifier;
pub mod normalizer;
pub mod responses;
pub mod vectorizer;

pub use classifier::{ClassModel, Prediction};
pub use normalizer::{EnglishNormalizer, TextNormalizer};
pub use responses::{ResponseTable, Selected};
pub use vectorizer::Vocabulary;
