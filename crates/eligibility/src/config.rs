// Rust guideline compliant 2026-10-17

//! Application configuration read from the environment.
//!
//! An optional `.env` file in the working directory is loaded first. Every
//! variable has a default except `TRAINING_SEED`, which stays unset for an
//! OS-seeded trainer.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:eligibility.db";
const DEFAULT_MODEL_PATH: &str = "models/knn_model.json";
const DEFAULT_REGION_API_BASE_URL: &str = "https://www.emsifa.com/api-wilayah-indonesia/api/";
const DEFAULT_REGION_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        /// Environment variable name.
        key: &'static str,
        /// Description of the accepted values.
        expected: &'static str,
        /// Raw value found.
        value: String,
    },
}

/// Top-level configuration of the `eligibility` binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `sqlx` connection URL of the recipient database.
    pub database_url: String,
    /// Location of the persisted KNN artifact.
    pub model_path: PathBuf,
    /// Root of the region reference API.
    pub region_api_base_url: String,
    /// Per-request timeout of the region API.
    pub region_api_timeout: Duration,
    /// Fixed trainer seed; `None` seeds from the OS.
    pub training_seed: Option<u64>,
    /// Cadence of batch progress reports.
    pub progress_interval: Duration,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a numeric variable does not parse
    /// or is zero where a positive value is required.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            tracing::warn!("config.load: ignoring unreadable .env error={e}");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let positive = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(key) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(v) if v > 0 => Ok(v),
                    _ => Err(ConfigError::Invalid { key, expected: "a positive integer", value: raw }),
                },
            }
        };
        let training_seed = match get("TRAINING_SEED") {
            None => None,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        key: "TRAINING_SEED",
                        expected: "an unsigned integer",
                        value: raw,
                    });
                }
            },
        };
        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            model_path: get("MODEL_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH), PathBuf::from),
            region_api_base_url: get("REGION_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_REGION_API_BASE_URL.to_owned()),
            region_api_timeout: Duration::from_secs(positive(
                "REGION_API_TIMEOUT_SECS",
                DEFAULT_REGION_API_TIMEOUT_SECS,
            )?),
            training_seed,
            progress_interval: Duration::from_millis(positive(
                "PROGRESS_INTERVAL_MS",
                DEFAULT_PROGRESS_INTERVAL_MS,
            )?),
        })
    }
}
