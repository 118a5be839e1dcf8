use chrono::Utc;
use tracing::info;

use super::CommandError;
use crate::db::{self, AppState};
use crate::models::WorkoutSession;
use crate::session::{SessionCompletion, SessionRunner};

/// Open a session on the server and build a runner over the day's exercises.
/// The runner is built first so an empty day never creates a remote session.
pub async fn start_workout(
  state: &AppState,
  plan_id: i64,
  training_day_id: i64,
  week_number: i64,
) -> Result<(WorkoutSession, SessionRunner), CommandError> {
  let days = db::load_training_days(&state.db, plan_id).await?;
  let day = days
    .iter()
    .find(|d| d.id == training_day_id)
    .ok_or(CommandError::UnknownTrainingDay { plan_id, training_day_id })?;

  let runner = SessionRunner::new(day.ordered_exercises())?;

  let session = state.api.start_session(plan_id, training_day_id, week_number).await?;
  db::save_session(&state.db, &session).await?;

  info!("Started session {} for {} (week {})", session.id, day.name, week_number);
  Ok((session, runner))
}

/// Submit the runner's results to the API, then mirror them locally
pub async fn complete_workout(
  state: &AppState,
  session_id: i64,
  completion: &SessionCompletion,
) -> Result<WorkoutSession, CommandError> {
  let remote = state.api.complete_session(session_id, completion).await?;

  db::save_session(&state.db, &remote).await?;
  let completed_at = remote.completed_at.unwrap_or_else(Utc::now);
  db::complete_session(&state.db, session_id, completion, completed_at).await?;

  Ok(remote)
}
