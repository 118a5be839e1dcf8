//! Operations exposed to the CLI, each a thin async wrapper over the
//! history store, the REST client and the pure engines.

pub mod progress;
pub mod session;
pub mod sync;

use serde::Serialize;

use crate::api::ApiError;
use crate::db::DbError;
use crate::progress::ProgressError;
use crate::session::RunnerError;

pub use progress::{get_plan_adherence, get_plan_progress, suggest_next_weights};
pub use session::{complete_workout, start_workout};
pub use sync::{sync_sessions, SyncSummary};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
  #[error(transparent)]
  Db(#[from] DbError),

  #[error(transparent)]
  Api(#[from] ApiError),

  #[error(transparent)]
  Progress(#[from] ProgressError),

  #[error(transparent)]
  Runner(#[from] RunnerError),

  #[error("Training day {training_day_id} is not part of plan {plan_id}")]
  UnknownTrainingDay { plan_id: i64, training_day_id: i64 },
}

impl Serialize for CommandError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}
