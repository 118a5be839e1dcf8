//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};

/// Workout planner - session history, progress and next-weight suggestions
#[derive(Debug, Parser)]
#[command(
  name = "workout-planner",
  about = "Track workout plan progress from the command line",
  version,
  after_help = "Configuration is read from the environment or a .env file (WORKOUT_API_URL, WORKOUT_DB_PATH, WORKOUT_API_TOKEN, RUST_LOG)"
)]
pub struct Cli {
  /// Subcommand to execute
  #[command(subcommand)]
  pub command: Command,
}

/// CLI subcommands. Every command prints JSON to stdout.
#[derive(Debug, Subcommand)]
pub enum Command {
  /// Fetch a plan and its session history from the API into the local store
  Sync {
    #[arg(short, long)]
    plan: i64,
  },

  /// Per-exercise weight progress for a plan
  Progress {
    #[arg(short, long)]
    plan: i64,
  },

  /// How many of the plan's sessions have been completed
  Adherence {
    #[arg(short, long)]
    plan: i64,
  },

  /// Suggest starting weights for the next session of a training day
  Suggest {
    #[arg(short, long)]
    plan: i64,

    /// Training day id
    #[arg(short, long)]
    day: i64,

    /// Kilograms added or removed per step
    #[arg(short, long, default_value = "2.5")]
    step: f64,
  },
}
