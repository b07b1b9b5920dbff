//! TF-IDF vectorization over a vocabulary learned from the training corpus.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Frozen token -> index map with per-token inverse document frequency.
///
/// Indices follow lexicographic token order so the same corpus always yields
/// the same layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
    documents: usize,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn idf(&self, token: &str) -> Option<f64> {
        self.index_of(token).map(|i| self.idf[i])
    }

    /// Tokens in index order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Number of documents the vocabulary was fitted on.
    pub fn document_count(&self) -> usize {
        self.documents
    }
}

/// Learns a `Vocabulary` from normalized texts (whitespace-separated tokens).
///
/// `idf = ln(N / df)`: a token present in every document weighs zero.
pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Result<Vocabulary, AppError> {
    if corpus.is_empty() {
        return Err(AppError::EmptyTrainingSet);
    }

    let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for text in corpus {
        let unique: HashSet<&str> = text.as_ref().split_whitespace().collect();
        for token in unique {
            *document_frequency.entry(token).or_insert(0) += 1;
        }
    }

    let n = corpus.len() as f64;
    let mut terms = Vec::with_capacity(document_frequency.len());
    let mut index = HashMap::with_capacity(document_frequency.len());
    let mut idf = Vec::with_capacity(document_frequency.len());

    for (i, (token, df)) in document_frequency.into_iter().enumerate() {
        terms.push(token.to_string());
        index.insert(token.to_string(), i);
        idf.push((n / df as f64).ln());
    }

    Ok(Vocabulary {
        terms,
        index,
        idf,
        documents: corpus.len(),
    })
}

/// Dense TF-IDF vector for `text`. Tokens outside the vocabulary are ignored.
pub fn transform(text: &str, vocabulary: &Vocabulary) -> Vec<f64> {
    let mut vector = vec![0.0; vocabulary.len()];
    for token in text.split_whitespace() {
        if let Some(i) = vocabulary.index_of(token) {
            vector[i] += vocabulary.idf[i];
        }
    }
    vector
}
