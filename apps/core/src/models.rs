use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A labelled training utterance together with one response for its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TrainingExample {
    /// Store-assigned insertion id.
    pub id: i64,
    /// The intent category (e.g. "greet"). Not unique.
    #[sqlx(rename = "tag")]
    pub label: String,
    /// Example user input for the label.
    pub pattern: String,
    /// A response template for the label.
    pub response: String,
}

impl TrainingExample {
    pub fn new(id: i64, label: &str, pattern: &str, response: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            pattern: pattern.to_string(),
            response: response.to_string(),
        }
    }
}

/// One processed user input, as written to the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// What the user typed.
    pub input: String,
    /// The label the classifier picked.
    pub predicted_label: String,
    /// The response sent back.
    pub response: String,
    /// Posterior probability of the predicted label, in `[0, 1]`.
    pub confidence: f64,
    /// Unix timestamp (seconds, UTC).
    pub timestamp: i64,
}

impl InteractionRecord {
    /// Creates a record stamped with the current time.
    pub fn now(input: &str, predicted_label: &str, response: &str, confidence: f64) -> Self {
        Self {
            input: input.to_string(),
            predicted_label: predicted_label.to_string(),
            response: response.to_string(),
            confidence,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// True when the confidence is a finite value inside `[0, 1]`.
    pub fn has_valid_confidence(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Number of stored examples for one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LabelCount {
    #[sqlx(rename = "tag")]
    pub label: String,
    pub count: i64,
}
