use tracing::debug;

use super::CommandError;
use crate::db::{self, AppState};
use crate::progress::{PlanAdherence, TrainingDayProgress};
use crate::progression::{self, WeightStep, WeightSuggestion};

/// Progress series for every exercise trained under a plan, from local history
pub async fn get_plan_progress(state: &AppState, plan_id: i64) -> Result<Vec<TrainingDayProgress>, CommandError> {
  let plan = db::load_plan(&state.db, plan_id).await?;
  let sessions = db::load_sessions(&state.db, Some(plan_id)).await?;

  let mut memos = state.progress.lock().unwrap_or_else(|e| e.into_inner());
  let memo = memos.entry(plan_id).or_default();
  let before = memo.computations();
  let progress = memo.get_or_compute(&sessions, plan.week_duration)?.to_vec();

  if memo.computations() == before {
    debug!("Progress for plan {} served from cache", plan_id);
  }

  Ok(progress)
}

pub async fn get_plan_adherence(state: &AppState, plan_id: i64) -> Result<PlanAdherence, CommandError> {
  let plan = db::load_plan(&state.db, plan_id).await?;
  let days = db::load_training_days(&state.db, plan_id).await?;
  let sessions = db::load_sessions(&state.db, Some(plan_id)).await?;

  let day_ids: Vec<i64> = days.iter().map(|d| d.id).collect();
  Ok(PlanAdherence::compute(&plan, &day_ids, &sessions))
}

/// Starting weights for the next session of one training day
pub async fn suggest_next_weights(
  state: &AppState,
  plan_id: i64,
  training_day_id: i64,
  step: &WeightStep,
) -> Result<Vec<WeightSuggestion>, CommandError> {
  let days = db::load_training_days(&state.db, plan_id).await?;
  let day = days
    .iter()
    .find(|d| d.id == training_day_id)
    .ok_or(CommandError::UnknownTrainingDay { plan_id, training_day_id })?;

  let sessions = db::load_sessions(&state.db, Some(plan_id)).await?;
  Ok(progression::suggest_next_weights(&day.ordered_exercises(), &sessions, step))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::test_support::test_state;
  use crate::db::DbError;
  use crate::models::NextPreference;
  use crate::progression::SuggestionDecision;
  use crate::test_utils::*;

  async fn seeded_state(server: &mockito::Server) -> AppState {
    let state = test_state(server).await;
    seed_test_plan(&state.db).await;

    let mut week_two = mock_log(100, "Squat", Some(105.0));
    week_two.next_preference = Some(NextPreference::Gain);
    let sessions = [
      mock_session(1, 10, 1, Some(datetime_days_ago(14)), vec![mock_log(100, "Squat", Some(100.0))]),
      mock_session(2, 10, 2, Some(datetime_days_ago(7)), vec![week_two]),
      mock_session(3, 20, 1, Some(datetime_days_ago(13)), vec![mock_log(200, "Bench Press", Some(60.0))]),
    ];
    for session in &sessions {
      db::save_session(&state.db, session).await.unwrap();
    }
    state
  }

  #[tokio::test]
  async fn test_plan_progress_is_memoized() {
    let server = mockito::Server::new_async().await;
    let state = seeded_state(&server).await;

    let progress = get_plan_progress(&state, 1).await.unwrap();
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].training_day_name, "Lower");
    let squat = &progress[0].exercises[0];
    assert_eq!(squat.exercise_name, "Squat");
    assert_eq!(squat.latest_weight, Some(105.0));
    crate::assert_approx_eq!(squat.progress_percentage.unwrap(), 5.0, 1e-9);

    let again = get_plan_progress(&state, 1).await.unwrap();
    assert_eq!(progress, again);
    assert_eq!(state.progress.lock().unwrap()[&1].computations(), 1);

    // New history invalidates the cached result
    db::save_session(
      &state.db,
      &mock_session(4, 10, 3, Some(datetime_days_ago(0)), vec![mock_log(100, "Squat", Some(110.0))]),
    )
    .await
    .unwrap();
    let updated = get_plan_progress(&state, 1).await.unwrap();
    assert_eq!(updated[0].exercises[0].latest_weight, Some(110.0));
    assert_eq!(state.progress.lock().unwrap()[&1].computations(), 2);

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_progress_for_unknown_plan() {
    let server = mockito::Server::new_async().await;
    let state = test_state(&server).await;

    let result = get_plan_progress(&state, 42).await;
    assert!(matches!(result, Err(CommandError::Db(DbError::NotFound(_)))));

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_plan_adherence() {
    let server = mockito::Server::new_async().await;
    let state = seeded_state(&server).await;

    let adherence = get_plan_adherence(&state, 1).await.unwrap();
    assert_eq!(adherence.expected_sessions, 16);
    assert_eq!(adherence.completed_sessions, 3);
    assert_eq!(adherence.current_week, Some(2));

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_suggestions_follow_day_order() {
    let server = mockito::Server::new_async().await;
    let state = seeded_state(&server).await;

    let suggestions = suggest_next_weights(&state, 1, 10, &WeightStep::default()).await.unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].exercise_name, "Squat");
    assert_eq!(suggestions[0].decision, SuggestionDecision::Increase);
    assert_eq!(suggestions[0].suggested_weight, Some(107.5));
    assert_eq!(suggestions[1].decision, SuggestionDecision::NoHistory);

    let unknown = suggest_next_weights(&state, 1, 99, &WeightStep::default()).await;
    assert!(matches!(unknown, Err(CommandError::UnknownTrainingDay { .. })));

    teardown_test_db(state.db).await;
  }
}
