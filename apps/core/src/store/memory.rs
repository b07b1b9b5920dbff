//! In-process stores.
//!
//! Same contracts as the SQLite stores, minus durability. Each store can be
//! switched offline to exercise failure paths.

use crate::error::AppError;
use crate::models::{InteractionRecord, LabelCount, TrainingExample};
use crate::store::traits::{ExampleStore, InteractionLog};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct InMemoryExampleStore {
    rows: Mutex<Vec<TrainingExample>>,
    offline: AtomicBool,
}

impl InMemoryExampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-filled with `(label, pattern, response)` triples, ids from 1.
    pub fn with_examples(examples: &[(&str, &str, &str)]) -> Self {
        let rows = examples
            .iter()
            .enumerate()
            .map(|(i, (label, pattern, response))| {
                TrainingExample::new(i as i64 + 1, label, pattern, response)
            })
            .collect();
        Self {
            rows: Mutex::new(rows),
            offline: AtomicBool::new(false),
        }
    }

    /// While offline every call fails with `StoreUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AppError::StoreUnavailable("example store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ExampleStore for InMemoryExampleStore {
    async fn insert(&self, label: &str, pattern: &str, response: &str) -> Result<i64, AppError> {
        self.check_online()?;
        if label.is_empty() || pattern.is_empty() || response.is_empty() {
            return Err(AppError::PersistenceFailure(
                "label, pattern and response must be non-empty".to_string(),
            ));
        }

        let mut rows = lock(&self.rows);
        let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        rows.push(TrainingExample::new(id, label, pattern, response));
        Ok(id)
    }

    async fn all(&self) -> Result<Vec<TrainingExample>, AppError> {
        self.check_online()?;
        let mut rows = lock(&self.rows).clone();
        rows.sort_by(|a, b| a.label.cmp(&b.label).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn clear(&self) -> Result<u64, AppError> {
        self.check_online()?;
        let mut rows = lock(&self.rows);
        let removed = rows.len() as u64;
        rows.clear();
        Ok(removed)
    }

    async fn label_counts(&self) -> Result<Vec<LabelCount>, AppError> {
        self.check_online()?;
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for row in lock(&self.rows).iter() {
            *counts.entry(row.label.clone()).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(label, count)| LabelCount { label, count })
            .collect())
    }

    async fn close(&self) {}
}

#[derive(Default)]
pub struct InMemoryInteractionLog {
    records: Mutex<Vec<InteractionRecord>>,
    failing: AtomicBool,
}

impl InMemoryInteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose every `append` fails.
    pub fn failing() -> Self {
        let log = Self::default();
        log.set_failing(true);
        log
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<InteractionRecord> {
        lock(&self.records).clone()
    }
}

#[async_trait]
impl InteractionLog for InMemoryInteractionLog {
    async fn append(&self, record: &InteractionRecord) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("interaction log offline".to_string()));
        }
        if !record.has_valid_confidence() {
            return Err(AppError::PersistenceFailure(format!(
                "confidence out of range: {}",
                record.confidence
            )));
        }
        lock(&self.records).push(record.clone());
        Ok(())
    }

    async fn close(&self) {}
}
