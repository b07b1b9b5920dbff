//! Runtime configuration.
//!
//! Values come from `INTENTBOT_*` environment variables, optionally seeded from
//! a `.env` file in the working directory.

use crate::error::AppError;
use crate::fs_manager::PortablePathManager;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

pub const DATABASE_URL_ENV: &str = "INTENTBOT_DATABASE_URL";
pub const STORE_TIMEOUT_ENV: &str = "INTENTBOT_STORE_TIMEOUT_MS";
pub const FALLBACK_RESPONSE_ENV: &str = "INTENTBOT_FALLBACK_RESPONSE";
pub const SMOOTHING_ALPHA_ENV: &str = "INTENTBOT_SMOOTHING_ALPHA";
pub const LOG_INTERACTIONS_ENV: &str = "INTENTBOT_LOG_INTERACTIONS";
pub const LOG_FORMAT_ENV: &str = "INTENTBOT_LOG_FORMAT";

pub const DEFAULT_FALLBACK_RESPONSE: &str = "I'm not sure how to help with that.";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Output format of the tracing subscriber installed by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!("Unknown log format: {}", other))),
        }
    }
}

/// Settings shared by the stores, the pipeline and the binary.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// SQLite URL used by both the example store and the interaction log.
    #[validate(length(min = 1))]
    pub database_url: String,
    /// Upper bound for any single store call, in milliseconds.
    #[validate(range(min = 1, max = 600_000))]
    pub store_timeout_ms: u64,
    /// Text returned when a label has no response templates.
    #[validate(length(min = 1))]
    pub fallback_response: String,
    /// Additive smoothing for the classifier's conditional weights.
    #[validate(range(exclusive_min = 0.0, max = 100.0))]
    pub smoothing_alpha: f64,
    /// Whether `predict_and_respond` writes to the interaction log.
    pub log_interactions: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: sqlite_url_for(&PortablePathManager::default_db_path().to_string_lossy()),
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            fallback_response: DEFAULT_FALLBACK_RESPONSE.to_string(),
            smoothing_alpha: 1.0,
            log_interactions: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if present), overlays environment variables on the defaults and validates.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_vars()
    }

    /// Like `from_env` but without touching `.env`.
    pub fn from_vars() -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(url) = read_var(DATABASE_URL_ENV) {
            config.database_url = url;
        }
        if let Some(ms) = read_var(STORE_TIMEOUT_ENV) {
            config.store_timeout_ms = parse_var(STORE_TIMEOUT_ENV, &ms)?;
        }
        if let Some(text) = read_var(FALLBACK_RESPONSE_ENV) {
            config.fallback_response = text;
        }
        if let Some(alpha) = read_var(SMOOTHING_ALPHA_ENV) {
            config.smoothing_alpha = parse_var(SMOOTHING_ALPHA_ENV, &alpha)?;
        }
        if let Some(flag) = read_var(LOG_INTERACTIONS_ENV) {
            config.log_interactions = parse_bool(LOG_INTERACTIONS_ENV, &flag)?;
        }
        if let Some(format) = read_var(LOG_FORMAT_ENV) {
            config.log_format = format.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Builds a `sqlite://` URL for a file path.
pub fn sqlite_url_for(path: &str) -> String {
    format!("sqlite://{}", path)
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", name, raw)))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{} is not a boolean: {}", name, raw))),
    }
}
