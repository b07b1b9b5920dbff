//! Response templates per label and uniform random selection among them.

use crate::models::TrainingExample;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label -> response templates, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseTable {
    templates: HashMap<String, Vec<String>>,
}

impl ResponseTable {
    /// Groups the examples' responses by label, keeping their order.
    pub fn from_examples(examples: &[TrainingExample]) -> Self {
        let mut templates: HashMap<String, Vec<String>> = HashMap::new();
        for example in examples {
            templates
                .entry(example.label.clone())
                .or_default()
                .push(example.response.clone());
        }
        Self { templates }
    }

    pub fn templates(&self, label: &str) -> Option<&[String]> {
        self.templates
            .get(label)
            .map(Vec::as_slice)
            .filter(|t| !t.is_empty())
    }

    pub fn label_count(&self) -> usize {
        self.templates.len()
    }
}

/// What `select` picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected<'a> {
    Template(&'a str),
    /// The label had no templates.
    Fallback(&'a str),
}

impl<'a> Selected<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Selected::Template(text) | Selected::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Selected::Fallback(_))
    }
}

/// Picks one template for `label` uniformly at random, or `fallback`. Never fails.
pub fn select<'a, R: RngCore + ?Sized>(
    label: &str,
    table: &'a ResponseTable,
    fallback: &'a str,
    rng: &mut R,
) -> Selected<'a> {
    match table.templates(label).and_then(|t| t.choose(rng)) {
        Some(text) => Selected::Template(text.as_str()),
        None => Selected::Fallback(fallback),
    }
}
