//! Multinomial Naive Bayes over TF-IDF vectors.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Learned parameters. Labels are kept in lexicographic order, which also
/// settles ties in favour of the smaller label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassModel {
    labels: Vec<String>,
    /// ln P(label)
    log_priors: Vec<f64>,
    /// ln P(token | label), one row per label.
    log_conditionals: Vec<Vec<f64>>,
    alpha: f64,
}

/// Result of classifying one vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Posterior probability of `label`, in `[0, 1]`.
    pub confidence: f64,
    /// Posterior for every label, in label order. Sums to 1.
    pub distribution: Vec<(String, f64)>,
}

impl ClassModel {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn vocabulary_size(&self) -> usize {
        self.log_conditionals.first().map_or(0, Vec::len)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn prior(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.log_priors[i].exp())
    }

    /// Scores `vector` against every label and returns the argmax with its posterior.
    pub fn predict(&self, vector: &[f64]) -> Result<Prediction, AppError> {
        if vector.len() != self.vocabulary_size() {
            return Err(AppError::Validation(format!(
                "vector has {} dimensions, model expects {}",
                vector.len(),
                self.vocabulary_size()
            )));
        }

        let scores: Vec<f64> = self
            .log_priors
            .iter()
            .zip(&self.log_conditionals)
            .map(|(prior, row)| {
                prior
                    + vector
                        .iter()
                        .zip(row)
                        .filter(|(x, _)| **x != 0.0)
                        .map(|(x, w)| x * w)
                        .sum::<f64>()
            })
            .collect();

        // Strictly-greater keeps the first (lexicographically smallest) label on ties.
        let mut best = 0;
        for (i, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = i;
            }
        }

        let max = scores[best];
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exp.iter().sum();

        let distribution: Vec<(String, f64)> = self
            .labels
            .iter()
            .zip(&exp)
            .map(|(label, e)| (label.clone(), (e / total).clamp(0.0, 1.0)))
            .collect();

        Ok(Prediction {
            label: self.labels[best].clone(),
            confidence: distribution[best].1,
            distribution,
        })
    }
}

/// Fits priors and Laplace-smoothed conditionals from `(vector, label)` pairs.
///
/// `cond(label, t) = (Σ x_t + α) / (Σ_all x + α·V)` over that label's vectors.
pub fn fit<S: AsRef<str>>(vectors: &[Vec<f64>], labels: &[S], alpha: f64) -> Result<ClassModel, AppError> {
    if vectors.is_empty() {
        return Err(AppError::EmptyTrainingSet);
    }
    if vectors.len() != labels.len() {
        return Err(AppError::Validation(format!(
            "{} vectors but {} labels",
            vectors.len(),
            labels.len()
        )));
    }
    if !(alpha.is_finite() && alpha > 0.0) {
        return Err(AppError::Validation(format!("alpha must be positive, got {}", alpha)));
    }

    let dims = vectors[0].len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(AppError::Validation(format!(
            "inconsistent vector length: {} vs {}",
            bad.len(),
            dims
        )));
    }

    // label -> (document count, summed token weights)
    let mut per_label: BTreeMap<&str, (usize, Vec<f64>)> = BTreeMap::new();
    for (vector, label) in vectors.iter().zip(labels) {
        let entry = per_label
            .entry(label.as_ref())
            .or_insert_with(|| (0, vec![0.0; dims]));
        entry.0 += 1;
        for (sum, x) in entry.1.iter_mut().zip(vector) {
            *sum += x;
        }
    }

    let total = vectors.len() as f64;
    let mut model = ClassModel {
        labels: Vec::with_capacity(per_label.len()),
        log_priors: Vec::with_capacity(per_label.len()),
        log_conditionals: Vec::with_capacity(per_label.len()),
        alpha,
    };

    for (label, (count, sums)) in per_label {
        let denominator = sums.iter().sum::<f64>() + alpha * dims as f64;
        let row = sums.iter().map(|s| ((s + alpha) / denominator).ln()).collect();

        model.labels.push(label.to_string());
        model.log_priors.push((count as f64 / total).ln());
        model.log_conditionals.push(row);
    }

    Ok(model)
}
