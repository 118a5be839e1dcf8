use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::models::{Exercise, ExerciseLog, NextPreference, TrainingDay, WorkoutPlan, WorkoutSession};
use crate::progress::ProgressMemo;
use crate::session::SessionCompletion;

pub type DbPool = SqlitePool;

/// Application state shared by the command layer
pub struct AppState {
  pub db: DbPool,
  pub api: ApiClient,
  /// Last progress aggregation per plan
  pub progress: Mutex<HashMap<i64, ProgressMemo>>,
}

impl AppState {
  pub fn new(db: DbPool, api: ApiClient) -> Self {
    Self {
      db,
      api,
      progress: Mutex::new(HashMap::new()),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DbError {
  #[error("Database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("Failed to prepare database directory: {0}")]
  Io(#[from] std::io::Error),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Corrupt row: {0}")]
  Corrupt(String),
}

/// ---------------------------------------------------------------------------
/// Setup
/// ---------------------------------------------------------------------------

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, DbError> {
  if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }
  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

  info!("Initializing database at: {}", db_path.display());

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
  value.and_then(|s| {
    DateTime::parse_from_rfc3339(&s)
      .map(|dt| dt.with_timezone(&Utc))
      .ok()
  })
}

/// ---------------------------------------------------------------------------
/// Plans and training days
/// ---------------------------------------------------------------------------

pub async fn save_plan(pool: &DbPool, plan: &WorkoutPlan) -> Result<(), DbError> {
  let now = Utc::now().to_rfc3339();

  sqlx::query(
    r#"
    INSERT INTO workout_plans (id, name, description, week_duration, is_active, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
      name = excluded.name,
      description = excluded.description,
      week_duration = excluded.week_duration,
      is_active = excluded.is_active,
      updated_at = excluded.updated_at
    "#,
  )
  .bind(plan.id)
  .bind(&plan.name)
  .bind(&plan.description)
  .bind(plan.week_duration)
  .bind(plan.is_active)
  .bind(plan.created_at.map(|d| d.to_rfc3339()).unwrap_or_else(|| now.clone()))
  .bind(plan.updated_at.map(|d| d.to_rfc3339()).unwrap_or(now))
  .execute(pool)
  .await?;

  Ok(())
}

fn plan_from_row(row: &SqliteRow) -> Result<WorkoutPlan, DbError> {
  Ok(WorkoutPlan {
    id: row.try_get("id")?,
    name: row.try_get("name")?,
    description: row.try_get("description")?,
    week_duration: row.try_get("week_duration")?,
    is_active: row.try_get("is_active")?,
    created_at: parse_timestamp(row.try_get("created_at")?),
    updated_at: parse_timestamp(row.try_get("updated_at")?),
  })
}

pub async fn load_plan(pool: &DbPool, plan_id: i64) -> Result<WorkoutPlan, DbError> {
  let row = sqlx::query(
    "SELECT id, name, description, week_duration, is_active, created_at, updated_at
     FROM workout_plans WHERE id = ?1",
  )
  .bind(plan_id)
  .fetch_optional(pool)
  .await?
  .ok_or_else(|| DbError::NotFound(format!("plan {}", plan_id)))?;

  plan_from_row(&row)
}

pub async fn load_plans(pool: &DbPool) -> Result<Vec<WorkoutPlan>, DbError> {
  let rows = sqlx::query(
    "SELECT id, name, description, week_duration, is_active, created_at, updated_at
     FROM workout_plans ORDER BY id",
  )
  .fetch_all(pool)
  .await?;

  rows.iter().map(plan_from_row).collect()
}

/// Upsert a training day and replace its exercises
pub async fn save_training_day(pool: &DbPool, day: &TrainingDay) -> Result<(), DbError> {
  let mut tx = pool.begin().await?;

  sqlx::query(
    r#"
    INSERT INTO training_days (id, plan_id, name, description)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(id) DO UPDATE SET
      plan_id = excluded.plan_id,
      name = excluded.name,
      description = excluded.description
    "#,
  )
  .bind(day.id)
  .bind(day.plan_id)
  .bind(&day.name)
  .bind(&day.description)
  .execute(&mut *tx)
  .await?;

  sqlx::query("DELETE FROM exercises WHERE training_day_id = ?1")
    .bind(day.id)
    .execute(&mut *tx)
    .await?;

  for exercise in &day.exercises {
    sqlx::query(
      r#"
      INSERT INTO exercises (id, training_day_id, order_number, name, sets, reps, tempo, rest_seconds, notes)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
      "#,
    )
    .bind(exercise.id)
    .bind(day.id)
    .bind(exercise.order_number)
    .bind(&exercise.name)
    .bind(exercise.sets)
    .bind(exercise.reps)
    .bind(&exercise.tempo)
    .bind(exercise.rest_seconds)
    .bind(&exercise.notes)
    .execute(&mut *tx)
    .await?;
  }

  tx.commit().await?;
  Ok(())
}

/// Training days of a plan with their exercises in execution order
pub async fn load_training_days(pool: &DbPool, plan_id: i64) -> Result<Vec<TrainingDay>, DbError> {
  let rows = sqlx::query(
    "SELECT id, plan_id, name, description FROM training_days WHERE plan_id = ?1 ORDER BY id",
  )
  .bind(plan_id)
  .fetch_all(pool)
  .await?;

  let mut days = Vec::with_capacity(rows.len());
  for row in rows {
    let id: i64 = row.try_get("id")?;
    days.push(TrainingDay {
      id,
      plan_id: row.try_get("plan_id")?,
      name: row.try_get("name")?,
      description: row.try_get("description")?,
      exercises: load_exercises(pool, id).await?,
    });
  }

  Ok(days)
}

async fn load_exercises(pool: &DbPool, training_day_id: i64) -> Result<Vec<Exercise>, DbError> {
  let rows = sqlx::query(
    r#"
    SELECT id, training_day_id, order_number, name, sets, reps, tempo, rest_seconds, notes
    FROM exercises
    WHERE training_day_id = ?1
    ORDER BY order_number
    "#,
  )
  .bind(training_day_id)
  .fetch_all(pool)
  .await?;

  rows
    .iter()
    .map(|row| -> Result<Exercise, DbError> {
      Ok(Exercise {
        id: row.try_get("id")?,
        training_day_id: row.try_get("training_day_id")?,
        order_number: row.try_get("order_number")?,
        name: row.try_get("name")?,
        sets: row.try_get("sets")?,
        reps: row.try_get("reps")?,
        tempo: row.try_get("tempo")?,
        rest_seconds: row.try_get("rest_seconds")?,
        notes: row.try_get("notes")?,
      })
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Session history
/// ---------------------------------------------------------------------------

/// Upsert a session and replace its exercise logs.
/// Returns true if the session was not stored before.
pub async fn save_session(pool: &DbPool, session: &WorkoutSession) -> Result<bool, DbError> {
  let mut tx = pool.begin().await?;

  let existed: Option<i64> = sqlx::query_scalar("SELECT id FROM workout_sessions WHERE id = ?1")
    .bind(session.id)
    .fetch_optional(&mut *tx)
    .await?;

  sqlx::query(
    r#"
    INSERT INTO workout_sessions (
      id, plan_id, training_day_id, training_day_name, week_number,
      is_completed, completed_at, notes
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(id) DO UPDATE SET
      plan_id = excluded.plan_id,
      training_day_id = excluded.training_day_id,
      training_day_name = excluded.training_day_name,
      week_number = excluded.week_number,
      is_completed = excluded.is_completed,
      completed_at = excluded.completed_at,
      notes = excluded.notes
    "#,
  )
  .bind(session.id)
  .bind(session.plan_id)
  .bind(session.training_day_id)
  .bind(&session.training_day_name)
  .bind(session.week_number)
  .bind(session.is_completed)
  .bind(session.completed_at.map(|d| d.to_rfc3339()))
  .bind(&session.notes)
  .execute(&mut *tx)
  .await?;

  replace_logs(&mut tx, session.id, &session.exercise_logs).await?;

  tx.commit().await?;
  Ok(existed.is_none())
}

async fn replace_logs(
  tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
  session_id: i64,
  logs: &[ExerciseLog],
) -> Result<(), DbError> {
  sqlx::query("DELETE FROM exercise_logs WHERE session_id = ?1")
    .bind(session_id)
    .execute(&mut **tx)
    .await?;

  for (position, log) in logs.iter().enumerate() {
    sqlx::query(
      r#"
      INSERT INTO exercise_logs (
        session_id, position, exercise_id, exercise_name, starting_weight,
        is_completed, notes, feeling, next_preference
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
      "#,
    )
    .bind(session_id)
    .bind(position as i64)
    .bind(log.exercise_id)
    .bind(&log.exercise_name)
    .bind(log.starting_weight)
    .bind(log.is_completed)
    .bind(&log.notes)
    .bind(log.feeling)
    .bind(log.next_preference.map(|p| p.to_string()))
    .execute(&mut **tx)
    .await?;
  }

  Ok(())
}

/// Load session history, optionally restricted to one plan.
/// Names fall back to the snapshot stored with the session when the day or
/// exercise is not known locally.
pub async fn load_sessions(pool: &DbPool, plan_id: Option<i64>) -> Result<Vec<WorkoutSession>, DbError> {
  let rows = sqlx::query(
    r#"
    SELECT
      s.id, s.plan_id, s.training_day_id,
      COALESCE(td.name, s.training_day_name) AS training_day_name,
      s.week_number, s.is_completed, s.completed_at, s.notes
    FROM workout_sessions s
    LEFT JOIN training_days td ON td.id = s.training_day_id
    WHERE ?1 IS NULL OR s.plan_id = ?1
    ORDER BY s.id
    "#,
  )
  .bind(plan_id)
  .fetch_all(pool)
  .await?;

  let mut sessions = Vec::with_capacity(rows.len());
  for row in rows {
    let id: i64 = row.try_get("id")?;
    sessions.push(WorkoutSession {
      id,
      plan_id: row.try_get("plan_id")?,
      training_day_id: row.try_get("training_day_id")?,
      training_day_name: row.try_get("training_day_name")?,
      week_number: row.try_get("week_number")?,
      is_completed: row.try_get("is_completed")?,
      completed_at: parse_timestamp(row.try_get("completed_at")?),
      notes: row.try_get("notes")?,
      exercise_logs: load_logs(pool, id).await?,
    });
  }

  debug!("Loaded {} sessions (plan filter: {:?})", sessions.len(), plan_id);
  Ok(sessions)
}

async fn load_logs(pool: &DbPool, session_id: i64) -> Result<Vec<ExerciseLog>, DbError> {
  let rows = sqlx::query(
    r#"
    SELECT
      l.id, l.exercise_id,
      COALESCE(e.name, l.exercise_name) AS exercise_name,
      l.starting_weight, l.is_completed, l.notes, l.feeling, l.next_preference
    FROM exercise_logs l
    LEFT JOIN exercises e ON e.id = l.exercise_id
    WHERE l.session_id = ?1
    ORDER BY l.position
    "#,
  )
  .bind(session_id)
  .fetch_all(pool)
  .await?;

  rows
    .iter()
    .map(|row| -> Result<ExerciseLog, DbError> {
      let next_preference = row
        .try_get::<Option<String>, _>("next_preference")?
        .map(|p| p.parse::<NextPreference>())
        .transpose()
        .map_err(DbError::Corrupt)?;

      Ok(ExerciseLog {
        id: row.try_get("id")?,
        exercise_id: row.try_get("exercise_id")?,
        exercise_name: row.try_get("exercise_name")?,
        starting_weight: row.try_get("starting_weight")?,
        is_completed: row.try_get("is_completed")?,
        notes: row.try_get("notes")?,
        feeling: row.try_get("feeling")?,
        next_preference,
      })
    })
    .collect()
}

/// Mark a stored session completed and record the runner's results
pub async fn complete_session(
  pool: &DbPool,
  session_id: i64,
  completion: &SessionCompletion,
  completed_at: DateTime<Utc>,
) -> Result<(), DbError> {
  let mut tx = pool.begin().await?;

  let updated = sqlx::query(
    "UPDATE workout_sessions SET is_completed = 1, completed_at = ?1 WHERE id = ?2",
  )
  .bind(completed_at.to_rfc3339())
  .bind(session_id)
  .execute(&mut *tx)
  .await?;

  if updated.rows_affected() == 0 {
    return Err(DbError::NotFound(format!("session {}", session_id)));
  }

  replace_logs(&mut tx, session_id, &completion.to_logs()).await?;

  tx.commit().await?;
  info!("Session {} completed with {} exercise logs", session_id, completion.exercises.len());
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
