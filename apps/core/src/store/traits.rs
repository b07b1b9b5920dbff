use crate::error::AppError;
use crate::models::{InteractionRecord, LabelCount, TrainingExample};
use async_trait::async_trait;

/// Durable table of `(label, pattern, response)` training examples.
///
/// Implementations convert every backend failure into an `AppError` at this
/// boundary; nothing is allowed to panic past it.
#[async_trait]
pub trait ExampleStore: Send + Sync + 'static {
    /// Inserts one example, committed before returning. Returns the new id.
    async fn insert(&self, label: &str, pattern: &str, response: &str) -> Result<i64, AppError>;

    /// Every stored example, sorted by `(label, id)`.
    async fn all(&self) -> Result<Vec<TrainingExample>, AppError>;

    /// Removes every example and returns how many were deleted.
    async fn clear(&self) -> Result<u64, AppError>;

    /// Example count per label, sorted by label.
    async fn label_counts(&self) -> Result<Vec<LabelCount>, AppError>;

    /// Releases the underlying connection.
    async fn close(&self);
}

/// Append-only record of processed inputs.
///
/// Failures are advisory: callers report them and carry on.
#[async_trait]
pub trait InteractionLog: Send + Sync + 'static {
    async fn append(&self, record: &InteractionRecord) -> Result<(), AppError>;

    /// Releases the underlying connection. A later `append` may reconnect.
    async fn close(&self);
}
