pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod progress;
pub mod progression;
pub mod session;

#[cfg(test)]
mod test_utils;

use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{ApiClient, ApiError, InMemoryTokenProvider};
use cli::{Cli, Command};
use commands::CommandError;
use config::{AppConfig, ConfigError};
use db::{AppState, DbError};
use progression::WeightStep;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Db(#[from] DbError),

  #[error(transparent)]
  Api(#[from] ApiError),

  #[error(transparent)]
  Command(#[from] CommandError),

  #[error("Failed to encode output: {0}")]
  Output(#[from] serde_json::Error),

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),
}

/// Install the global subscriber. Logs go to stderr so stdout stays JSON.
/// Later calls are ignored.
pub fn init_tracing(filter: &str) {
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::new(filter))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .try_init()
    .ok();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
  let config = AppConfig::from_env()?;
  init_tracing(&config.log_filter);

  let pool = db::initialize_db(&config.db_path).await?;
  let tokens = Arc::new(InMemoryTokenProvider::new(config.api_token.clone()));
  let api = ApiClient::new(&config.api_url, tokens)?;
  let state = AppState::new(pool, api);

  info!("Using API at {}", config.api_url);

  match cli.command {
    Command::Sync { plan } => print_json(&commands::sync_sessions(&state, plan).await?)?,
    Command::Progress { plan } => print_json(&commands::get_plan_progress(&state, plan).await?)?,
    Command::Adherence { plan } => print_json(&commands::get_plan_adherence(&state, plan).await?)?,
    Command::Suggest { plan, day, step } => {
      let step = WeightStep::new(step).map_err(AppError::InvalidArgument)?;
      print_json(&commands::suggest_next_weights(&state, plan, day, &step).await?)?
    }
  }

  state.db.close().await;
  Ok(())
}
