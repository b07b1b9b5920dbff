use std::io;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// The store connection could not be established or was lost.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// No training examples were available to train on.
    #[error("No training examples available")]
    EmptyTrainingSet,

    /// A write was rejected by the store (e.g. a constraint violation).
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// `train()` was called before any examples were loaded.
    #[error("Training data not loaded")]
    NotLoaded,

    /// A prediction was requested before the pipeline was trained.
    #[error("Pipeline not trained")]
    NotTrained,

    /// Represents data validation errors (e.g., mismatched vector lengths).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents configuration-related errors (e.g., malformed environment variables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents errors from store operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::StoreUnavailable(s) => AppError::StoreUnavailable(s.clone()),
            AppError::EmptyTrainingSet => AppError::EmptyTrainingSet,
            AppError::PersistenceFailure(s) => AppError::PersistenceFailure(s.clone()),
            AppError::NotLoaded => AppError::NotLoaded,
            AppError::NotTrained => AppError::NotTrained,
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Timeout(s) => AppError::Timeout(s.clone()),
        }
    }
}

impl AppError {
    /// True for failures caused by a missing or broken connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_) | AppError::Timeout(_))
    }
}

/// Connection-level failures become `StoreUnavailable`; everything the
/// database itself rejected becomes `PersistenceFailure`.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => AppError::StoreUnavailable(err.to_string()),
            other => AppError::PersistenceFailure(other.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Store operation timed out: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(format!("Validation errors: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_map_to_store_unavailable() {
        let err: AppError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_row_errors_map_to_persistence_failure() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::PersistenceFailure(_)));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_clone_preserves_variant() {
        let err = AppError::Timeout("slow".to_string());
        assert!(matches!(err.clone(), AppError::Timeout(s) if s == "slow"));
    }
}
