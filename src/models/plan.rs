use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::progress::MAX_WEEK_DURATION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  /// Number of weeks the plan spans
  pub week_duration: i64,
  #[serde(default)]
  pub is_active: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

impl WorkoutPlan {
  /// Whether `week` falls inside the plan's 1-based week range,
  /// capped at the longest plan the progress views lay out
  pub fn contains_week(&self, week: i64) -> bool {
    week >= 1 && week <= self.week_duration.min(MAX_WEEK_DURATION)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingDay {
  pub id: i64,
  pub plan_id: i64,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub exercises: Vec<Exercise>,
}

impl TrainingDay {
  /// Exercises in execution order
  pub fn ordered_exercises(&self) -> Vec<Exercise> {
    let mut exercises = self.exercises.clone();
    exercises.sort_by_key(|e| e.order_number);
    exercises
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  pub id: i64,
  pub training_day_id: i64,
  /// 1-based position within the owning training day
  pub order_number: i64,
  pub name: String,
  pub sets: u32,
  pub reps: u32,
  pub tempo: String,
  #[serde(default)]
  pub rest_seconds: u32,
  #[serde(default)]
  pub notes: Option<String>,
}

impl Exercise {
  pub fn parsed_tempo(&self) -> Result<Tempo, TempoError> {
    self.tempo.parse()
  }
}

/// ---------------------------------------------------------------------------
/// Tempo
/// ---------------------------------------------------------------------------

/// Lifting tempo such as `3-1-1-0`: eccentric, pause, concentric and an
/// optional top pause, each in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
  phases: [u8; 4],
  len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TempoError {
  #[error("Tempo must have 3 or 4 phases, got {0}")]
  PhaseCount(usize),

  #[error("Invalid tempo phase: {0:?}")]
  InvalidPhase(String),
}

impl Tempo {
  pub fn phases(&self) -> &[u8] {
    &self.phases[..self.len]
  }

  /// Time under tension for a single rep
  pub fn seconds_per_rep(&self) -> u32 {
    self.phases().iter().map(|&p| p as u32).sum()
  }
}

impl FromStr for Tempo {
  type Err = TempoError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = s.trim().split('-').collect();
    if !(3..=4).contains(&parts.len()) {
      return Err(TempoError::PhaseCount(parts.len()));
    }

    let mut phases = [0u8; 4];
    for (i, part) in parts.iter().enumerate() {
      let mut chars = part.chars();
      phases[i] = match (chars.next().and_then(|c| c.to_digit(10)), chars.next()) {
        (Some(d), None) => d as u8,
        _ => return Err(TempoError::InvalidPhase(part.to_string())),
      };
    }

    Ok(Self {
      phases,
      len: parts.len(),
    })
  }
}

impl fmt::Display for Tempo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let joined: Vec<String> = self.phases().iter().map(|p| p.to_string()).collect();
    write!(f, "{}", joined.join("-"))
  }
}
