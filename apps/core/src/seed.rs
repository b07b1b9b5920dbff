//! Default training data and the routine that writes it to an example store.

use crate::error::AppError;
use crate::models::LabelCount;
use crate::store::traits::ExampleStore;
use serde::Serialize;
use tracing::{info, warn};

/// `(pattern, label)` pairs shipped with the bot.
pub const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("hello", "greet"),
    ("hi there", "greet"),
    ("hey", "greet"),
    ("good morning", "greet"),
    ("good afternoon", "greet"),
    ("bye", "bye"),
    ("goodbye", "bye"),
    ("see you later", "bye"),
    ("talk to you soon", "bye"),
    ("have a good day", "bye"),
    ("what's the weather", "weather"),
    ("how's the weather today", "weather"),
    ("is it raining", "weather"),
    ("will it be sunny", "weather"),
    ("weather forecast", "weather"),
    ("tell me about you", "personal"),
    ("who are you", "personal"),
    ("what do you know about me", "personal"),
    ("tell me about the developer", "personal"),
    ("what's your background", "personal"),
    ("introduce yourself", "personal"),
];

/// Response templates per label.
pub const DEFAULT_RESPONSES: &[(&str, &[&str])] = &[
    (
        "greet",
        &["Hello! How can I help you today?", "Hi there! What can I do for you?"],
    ),
    ("bye", &["Goodbye! Have a great day!", "See you later! Take care!"]),
    (
        "weather",
        &[
            "I can help with weather info! What city are you interested in?",
            "Weather updates coming right up! Which location?",
        ],
    ),
    (
        "personal",
        &[
            "I'm IntentBot, a small assistant that sorts what you say into a handful of intents.",
            "I'm a lightweight intent classifier trained on a few dozen example phrases.",
            "I'm IntentBot! I match your message to an intent and reply with one of my stored answers.",
        ],
    ),
];

const UNKNOWN_RESPONSE: &str = "I'm not sure how to help with that.";

/// Outcome of a seeding run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub cleared: u64,
    pub inserted: usize,
    pub failed: usize,
    pub distribution: Vec<LabelCount>,
}

/// The default dataset as `(label, pattern, response)` rows. Each label's
/// patterns cycle through that label's responses in order.
pub fn default_examples() -> Vec<(&'static str, &'static str, &'static str)> {
    let mut seen: Vec<(&str, usize)> = Vec::new();
    DEFAULT_PATTERNS
        .iter()
        .map(|&(pattern, label)| {
            let nth = match seen.iter_mut().find(|(l, _)| *l == label) {
                Some((_, n)) => {
                    *n += 1;
                    *n
                }
                None => {
                    seen.push((label, 0));
                    0
                }
            };
            let response = DEFAULT_RESPONSES
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, responses)| responses[nth % responses.len()])
                .unwrap_or(UNKNOWN_RESPONSE);
            (label, pattern, response)
        })
        .collect()
}

/// Writes the default dataset. Existing rows are removed first unless
/// `keep_existing` is set. Individual insert failures are counted, not fatal.
pub async fn seed_default(
    store: &dyn ExampleStore,
    keep_existing: bool,
) -> Result<SeedReport, AppError> {
    let cleared = if keep_existing {
        0
    } else {
        info!("Clearing existing training data...");
        store.clear().await?
    };

    let mut inserted = 0;
    let mut failed = 0;
    for (label, pattern, response) in default_examples() {
        match store.insert(label, pattern, response).await {
            Ok(_) => inserted += 1,
            Err(e) => {
                warn!("Failed to insert {}: '{}': {}", label, pattern, e);
                failed += 1;
            }
        }
    }

    let distribution = store.label_counts().await?;
    info!("Seeded {} training examples ({} failed)", inserted, failed);

    Ok(SeedReport {
        cleared,
        inserted,
        failed,
        distribution,
    })
}
