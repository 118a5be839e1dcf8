use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One attempt at a training day during a specific week of a plan.
/// Once `completed_at` is set the session is treated as immutable history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
  pub id: i64,
  pub plan_id: i64,
  pub training_day_id: i64,
  /// Denormalized for display; the API includes it when the day is joined
  #[serde(default)]
  pub training_day_name: Option<String>,
  pub week_number: i64,
  #[serde(default)]
  pub is_completed: bool,
  #[serde(default)]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub exercise_logs: Vec<ExerciseLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
  #[serde(default)]
  pub id: i64,
  pub exercise_id: i64,
  #[serde(default)]
  pub exercise_name: Option<String>,
  /// Kilograms, `None` when not recorded
  #[serde(default)]
  pub starting_weight: Option<f64>,
  #[serde(default)]
  pub is_completed: bool,
  #[serde(default)]
  pub notes: Option<String>,
  /// Subjective effort, 1-10
  #[serde(default)]
  pub feeling: Option<u8>,
  #[serde(default)]
  pub next_preference: Option<NextPreference>,
}

impl ExerciseLog {
  pub fn new(exercise_id: i64) -> Self {
    Self {
      id: 0,
      exercise_id,
      exercise_name: None,
      starting_weight: None,
      is_completed: false,
      notes: None,
      feeling: None,
      next_preference: None,
    }
  }

  /// Attach a feeling score, rejecting values outside 1-10
  pub fn with_feeling(mut self, feeling: u8) -> Result<Self, String> {
    if !(1..=10).contains(&feeling) {
      return Err(format!("Feeling must be between 1 and 10, got {}", feeling));
    }
    self.feeling = Some(feeling);
    Ok(self)
  }
}

/// What the user wants to do with the weight next time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NextPreference {
  Gain,
  Stay,
  Lower,
}

impl std::fmt::Display for NextPreference {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Gain => write!(f, "GAIN"),
      Self::Stay => write!(f, "STAY"),
      Self::Lower => write!(f, "LOWER"),
    }
  }
}

impl std::str::FromStr for NextPreference {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "GAIN" => Ok(Self::Gain),
      "STAY" => Ok(Self::Stay),
      "LOWER" => Ok(Self::Lower),
      _ => Err(format!("Unknown next preference: {}", s)),
    }
  }
}
