//! Test Module
//!
//! Cross-module test suite for the IntentBot core.
//!
//! ## Test Categories
//! - `brain_tests`: normalization, vectorization and classification properties
//! - `database_tests`: SQLite example store and interaction log
//! - `pipeline_tests`: load/train/predict/respond/log scenarios
//! - `chaos_test`: concurrent predictions during retraining

pub mod database_tests;
pub mod pipeline_tests;
