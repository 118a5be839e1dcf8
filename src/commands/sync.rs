use serde::{Deserialize, Serialize};
use tracing::info;

use super::CommandError;
use crate::db::{self, AppState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
  pub plan_id: i64,
  pub training_days: usize,
  pub sessions_fetched: usize,
  pub sessions_new: usize,
}

/// Pull a plan, its training days and its session history from the API
/// into the local store. Existing sessions are overwritten with the
/// server's copy.
pub async fn sync_sessions(state: &AppState, plan_id: i64) -> Result<SyncSummary, CommandError> {
  let plan = state.api.get_plan(plan_id).await?;
  db::save_plan(&state.db, &plan).await?;

  let days = state.api.list_training_days(plan_id).await?;
  for day in &days {
    db::save_training_day(&state.db, day).await?;
  }

  let sessions = state.api.list_sessions(Some(plan_id)).await?;
  let mut sessions_new = 0;
  for session in &sessions {
    if db::save_session(&state.db, session).await? {
      sessions_new += 1;
    }
  }

  info!(
    "Synced plan {}: {} training days, {} sessions ({} new)",
    plan_id,
    days.len(),
    sessions.len(),
    sessions_new
  );

  Ok(SyncSummary {
    plan_id,
    training_days: days.len(),
    sessions_fetched: sessions.len(),
    sessions_new,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ApiError;
  use crate::commands::test_support::test_state;
  use crate::test_utils::teardown_test_db;

  const PLAN: &str = r#"{"id":1,"name":"Strength","weekDuration":4,"isActive":true}"#;
  const DAYS: &str = r#"[{"id":10,"planId":1,"name":"Lower","exercises":[
    {"id":100,"trainingDayId":10,"orderNumber":1,"name":"Squat","sets":3,"reps":5,"tempo":"3-1-1-0","restSeconds":120}
  ]}]"#;
  const SESSIONS: &str = r#"[
    {"id":1,"planId":1,"trainingDayId":10,"weekNumber":1,"isCompleted":true,"completedAt":"2025-01-01T10:00:00Z",
     "exerciseLogs":[{"exerciseId":100,"startingWeight":100.0,"isCompleted":true}]},
    {"id":2,"planId":1,"trainingDayId":10,"weekNumber":2,"isCompleted":true,"completedAt":"2025-01-08T10:00:00Z",
     "exerciseLogs":[{"exerciseId":100,"startingWeight":105.0,"isCompleted":true}]}
  ]"#;

  async fn mock_plan_endpoints(server: &mut mockito::Server) {
    server.mock("GET", "/api/plans/1").with_status(200).with_body(PLAN).create_async().await;
    server
      .mock("GET", "/api/plans/1/training-days")
      .with_status(200)
      .with_body(DAYS)
      .create_async()
      .await;
  }

  #[tokio::test]
  async fn test_sync_stores_plan_days_and_sessions() {
    let mut server = mockito::Server::new_async().await;
    mock_plan_endpoints(&mut server).await;
    server
      .mock("GET", "/api/sessions")
      .match_query(mockito::Matcher::UrlEncoded("planId".into(), "1".into()))
      .with_status(200)
      .with_body(SESSIONS)
      .expect(2)
      .create_async()
      .await;

    let state = test_state(&server).await;

    let summary = sync_sessions(&state, 1).await.unwrap();
    assert_eq!(summary.training_days, 1);
    assert_eq!(summary.sessions_fetched, 2);
    assert_eq!(summary.sessions_new, 2);

    // Second sync only overwrites
    let again = sync_sessions(&state, 1).await.unwrap();
    assert_eq!(again.sessions_new, 0);

    let stored = db::load_sessions(&state.db, Some(1)).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].training_day_name.as_deref(), Some("Lower"));
    assert_eq!(stored[1].exercise_logs[0].exercise_name.as_deref(), Some("Squat"));

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_sync_surfaces_fetch_failures() {
    let mut server = mockito::Server::new_async().await;
    mock_plan_endpoints(&mut server).await;
    server.mock("GET", "/api/sessions").with_status(401).create_async().await;

    let state = test_state(&server).await;
    let result = sync_sessions(&state, 1).await;

    assert!(matches!(result, Err(CommandError::Api(ApiError::Unauthorized))));
    assert_eq!(state.api.tokens().get(), None);

    teardown_test_db(state.db).await;
  }
}
