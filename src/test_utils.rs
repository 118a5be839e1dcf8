//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Helper assertions

use crate::models::{Exercise, ExerciseLog, TrainingDay, WorkoutPlan, WorkoutSession};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Seed plan 1 (8 weeks) with two training days:
/// - day 10 "Lower": Squat (100), Romanian Deadlift (101)
/// - day 20 "Upper": Bench Press (200)
pub async fn seed_test_plan(pool: &SqlitePool) -> WorkoutPlan {
  let plan = mock_plan(1, 8);
  crate::db::save_plan(pool, &plan)
    .await
    .expect("Failed to seed plan");

  let lower = TrainingDay {
    id: 10,
    plan_id: 1,
    name: "Lower".to_string(),
    description: None,
    exercises: vec![
      // Stored out of order on purpose
      Exercise { training_day_id: 10, ..mock_exercise(101, 2, "Romanian Deadlift", 3, 90) },
      Exercise { training_day_id: 10, ..mock_exercise(100, 1, "Squat", 3, 120) },
    ],
  };
  let upper = TrainingDay {
    id: 20,
    plan_id: 1,
    name: "Upper".to_string(),
    description: Some("Push focus".to_string()),
    exercises: vec![Exercise { training_day_id: 20, ..mock_exercise(200, 1, "Bench Press", 4, 90) }],
  };

  for day in [&lower, &upper] {
    crate::db::save_training_day(pool, day)
      .await
      .expect("Failed to seed training day");
  }

  plan
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_plan(id: i64, week_duration: i64) -> WorkoutPlan {
  WorkoutPlan {
    id,
    name: format!("Plan {}", id),
    description: None,
    week_duration,
    is_active: true,
    created_at: None,
    updated_at: None,
  }
}

/// Exercise on training day 1 with a 3-1-1-0 tempo and 8 reps
pub fn mock_exercise(id: i64, order_number: i64, name: &str, sets: u32, rest_seconds: u32) -> Exercise {
  Exercise {
    id,
    training_day_id: 1,
    order_number,
    name: name.to_string(),
    sets,
    reps: 8,
    tempo: "3-1-1-0".to_string(),
    rest_seconds,
    notes: None,
  }
}

/// Finished log for one exercise
pub fn mock_log(exercise_id: i64, name: &str, weight: Option<f64>) -> ExerciseLog {
  ExerciseLog {
    exercise_name: Some(name.to_string()),
    starting_weight: weight,
    is_completed: true,
    ..ExerciseLog::new(exercise_id)
  }
}

/// Completed session of plan 1, named "Day {training_day_id}"
pub fn mock_session(
  id: i64,
  training_day_id: i64,
  week_number: i64,
  completed_at: Option<DateTime<Utc>>,
  exercise_logs: Vec<ExerciseLog>,
) -> WorkoutSession {
  WorkoutSession {
    id,
    plan_id: 1,
    training_day_id,
    training_day_name: Some(format!("Day {}", training_day_id)),
    week_number,
    is_completed: true,
    completed_at,
    notes: None,
    exercise_logs,
  }
}

/// ---------------------------------------------------------------------------
/// Date/Time Utilities
/// ---------------------------------------------------------------------------

/// Get a datetime N days ago from now
pub fn datetime_days_ago(days: i64) -> DateTime<Utc> {
  Utc::now() - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Assertion Helpers
/// ---------------------------------------------------------------------------

/// Assert that two floating point values are approximately equal
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_test_db() {
    let pool = setup_test_db().await;

    let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workout_sessions")
      .fetch_one(&pool)
      .await
      .expect("Failed to query workout_sessions");

    assert_eq!(result.0, 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_test_plan() {
    let pool = setup_test_db().await;
    let plan = seed_test_plan(&pool).await;
    assert_eq!(plan.week_duration, 8);

    let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM exercises")
      .fetch_one(&pool)
      .await
      .expect("Failed to count exercises");

    assert_eq!(result.0, 3);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_session_defaults() {
    let session = mock_session(1, 10, 2, None, vec![mock_log(100, "Squat", Some(80.0))]);
    assert!(session.is_completed);
    assert_eq!(session.training_day_name.as_deref(), Some("Day 10"));
    assert!(session.exercise_logs[0].is_completed);
  }

  #[test]
  fn test_datetime_days_ago() {
    let now = Utc::now();
    let week_ago = datetime_days_ago(7);
    let diff = now.signed_duration_since(week_ago);
    assert!(diff.num_days() >= 6 && diff.num_days() <= 7);
  }

  #[test]
  fn test_assert_approx_eq() {
    assert_approx_eq!(1.0_f64, 1.0001_f64, 0.001_f64);
    assert_approx_eq!(100.0_f64, 100.05_f64, 0.1_f64);
  }
}
