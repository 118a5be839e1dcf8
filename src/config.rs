use std::env;
use std::path::PathBuf;
use url::Url;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_DB_PATH: &str = "workout-planner.db";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  /// Base URL of the workout REST API
  pub api_url: String,
  pub db_path: PathBuf,
  /// Seeds the token provider so the CLI can skip logging in
  pub api_token: Option<String>,
  pub log_filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid configuration for {key}: {reason}")]
  Invalid { key: String, reason: String },
}

fn optional(key: &str) -> Option<String> {
  env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
  /// Read configuration from the environment, loading `.env` first if present
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();

    let api_url = env::var("WORKOUT_API_URL").map_err(|_| ConfigError::MissingConfig("WORKOUT_API_URL".into()))?;
    Url::parse(&api_url).map_err(|e| ConfigError::Invalid {
      key: "WORKOUT_API_URL".into(),
      reason: e.to_string(),
    })?;

    Ok(Self {
      api_url,
      db_path: optional("WORKOUT_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
      api_token: optional("WORKOUT_API_TOKEN"),
      log_filter: optional("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
    })
  }
}
