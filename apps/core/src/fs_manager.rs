use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Environment variable overriding the application root directory.
pub const HOME_ENV: &str = "INTENTBOT_HOME";

pub struct PortablePathManager;

impl PortablePathManager {
    /// Application root: `INTENTBOT_HOME` if set, else the executable's directory.
    pub fn root_dir() -> PathBuf {
        if let Ok(home) = std::env::var(HOME_ENV) {
            if !home.trim().is_empty() {
                return PathBuf::from(home);
            }
        }

        match std::env::current_exe() {
            Ok(mut path) => {
                path.pop(); // drop the executable name
                path
            }
            Err(e) => {
                warn!(
                    "Failed to get current exe path: {}. Falling back to current_dir.",
                    e
                );
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            }
        }
    }

    /// Main data directory (./data).
    pub fn data_dir() -> PathBuf {
        Self::root_dir().join("data")
    }

    /// Database directory (./data/db).
    pub fn db_dir() -> PathBuf {
        Self::data_dir().join("db")
    }

    /// Default SQLite file holding both the example store and the interaction log.
    pub fn default_db_path() -> PathBuf {
        Self::db_dir().join("intentbot.sqlite")
    }

    /// Creates the data and db directories if they don't exist.
    pub fn init() -> Result<(), std::io::Error> {
        let db_path = Self::db_dir();
        if !db_path.exists() {
            info!("Creating db directory: {:?}", db_path);
            fs::create_dir_all(&db_path)?;
        }
        Ok(())
    }
}
