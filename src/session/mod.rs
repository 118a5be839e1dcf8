//! Workout session runner
//!
//! Steps through one training day's exercises, counting completed sets,
//! capturing the entered weight, and running a single rest countdown.
//! The runner is plain state; [`RestTimerDriver`] attaches the one-second
//! tick source.

pub mod timer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::plan::TempoError;
use crate::models::{Exercise, ExerciseLog};

pub use timer::RestTimerDriver;

/// ---------------------------------------------------------------------------
/// State
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseState {
  pub completed_sets: u32,
  /// Raw user input, parsed only on completion
  pub weight: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
  pub remaining_seconds: u32,
  pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunnerError {
  #[error("No exercises found for this training day")]
  NoExercises,

  #[error("Exercise {exercise} has an unusable tempo: {source}")]
  InvalidTempo { exercise: String, source: TempoError },
}

#[derive(Debug, Clone)]
pub struct SessionRunner {
  exercises: Vec<Exercise>,
  index: usize,
  states: Vec<ExerciseState>,
  timer: TimerState,
  /// Bumped on every timer change; ticks scheduled for an older generation are dropped
  generation: u64,
}

impl SessionRunner {
  pub fn new(exercises: Vec<Exercise>) -> Result<Self, RunnerError> {
    if exercises.is_empty() {
      return Err(RunnerError::NoExercises);
    }
    for exercise in &exercises {
      exercise.parsed_tempo().map_err(|source| RunnerError::InvalidTempo {
        exercise: exercise.name.clone(),
        source,
      })?;
    }
    let states = vec![ExerciseState::default(); exercises.len()];
    Ok(Self {
      exercises,
      index: 0,
      states,
      timer: TimerState::default(),
      generation: 0,
    })
  }

  pub fn current_index(&self) -> usize {
    self.index
  }

  pub fn exercise_count(&self) -> usize {
    self.exercises.len()
  }

  pub fn is_last(&self) -> bool {
    self.index + 1 == self.exercises.len()
  }

  pub fn current_exercise(&self) -> &Exercise {
    &self.exercises[self.index]
  }

  pub fn current_state(&self) -> &ExerciseState {
    &self.states[self.index]
  }

  pub fn exercise_state(&self, index: usize) -> Option<&ExerciseState> {
    self.states.get(index)
  }

  pub fn timer(&self) -> TimerState {
    self.timer
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  /// ---------------------------------------------------------------------------
  /// Navigation
  /// ---------------------------------------------------------------------------

  /// Move to the next exercise. Returns false (and changes nothing) on the last one.
  pub fn advance(&mut self) -> bool {
    if self.index + 1 >= self.exercises.len() {
      return false;
    }
    self.index += 1;
    self.reset_timer();
    true
  }

  /// Move to the previous exercise. Returns false (and changes nothing) on the first one.
  pub fn retreat(&mut self) -> bool {
    if self.index == 0 {
      return false;
    }
    self.index -= 1;
    self.reset_timer();
    true
  }

  /// ---------------------------------------------------------------------------
  /// Sets and weight
  /// ---------------------------------------------------------------------------

  /// Count one more completed set. Starts the rest timer while sets remain;
  /// returns whether it did.
  pub fn record_set(&mut self) -> bool {
    let sets = self.current_exercise().sets;
    let state = &mut self.states[self.index];
    state.completed_sets += 1;

    if state.completed_sets < sets {
      self.start_timer();
      true
    } else {
      false
    }
  }

  pub fn set_weight(&mut self, value: impl Into<String>) {
    self.states[self.index].weight = value.into();
  }

  /// ---------------------------------------------------------------------------
  /// Rest timer
  /// ---------------------------------------------------------------------------

  /// Load the current exercise's rest period and start counting down.
  /// Returns the new timer generation.
  pub fn start_timer(&mut self) -> u64 {
    self.timer = TimerState {
      remaining_seconds: self.current_exercise().rest_seconds,
      running: true,
    };
    self.bump_generation()
  }

  pub fn stop_timer(&mut self) -> u64 {
    self.timer.running = false;
    self.bump_generation()
  }

  pub fn reset_timer(&mut self) -> u64 {
    self.timer = TimerState::default();
    self.bump_generation()
  }

  /// One second elapsed on the current timer
  pub fn tick(&mut self) -> bool {
    self.tick_generation(self.generation)
  }

  /// Apply a tick scheduled for `generation`. Stale ticks, ticks on a
  /// stopped timer and ticks at zero are ignored.
  pub fn tick_generation(&mut self, generation: u64) -> bool {
    if generation != self.generation || !self.timer.running || self.timer.remaining_seconds == 0 {
      return false;
    }
    self.timer.remaining_seconds -= 1;
    if self.timer.remaining_seconds == 0 {
      self.timer.running = false;
    }
    true
  }

  fn bump_generation(&mut self) -> u64 {
    self.generation = self.generation.wrapping_add(1);
    self.generation
  }

  /// ---------------------------------------------------------------------------
  /// Completion
  /// ---------------------------------------------------------------------------

  /// Snapshot of what would be submitted if the session ended now
  pub fn completion(&self) -> SessionCompletion {
    let exercises = self
      .exercises
      .iter()
      .zip(&self.states)
      .map(|(exercise, state)| {
        (
          exercise.id,
          ExerciseResult {
            exercise_name: exercise.name.clone(),
            order_number: exercise.order_number,
            completed_sets: state.completed_sets,
            starting_weight: parse_weight(&state.weight),
            is_completed: state.completed_sets >= exercise.sets,
          },
        )
      })
      .collect();

    SessionCompletion { exercises }
  }

  /// Finish the session. Persisting the result is up to the caller.
  pub fn complete(self) -> SessionCompletion {
    self.completion()
  }
}

/// Accepts `82.5` and `82,5`; blank or non-numeric input is "not recorded".
fn parse_weight(raw: &str) -> Option<f64> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  trimmed
    .replace(',', ".")
    .parse::<f64>()
    .ok()
    .filter(|w| w.is_finite())
}

/// ---------------------------------------------------------------------------
/// Completion payload
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseResult {
  pub exercise_name: String,
  pub order_number: i64,
  pub completed_sets: u32,
  pub starting_weight: Option<f64>,
  pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCompletion {
  /// Keyed by exercise id
  pub exercises: BTreeMap<i64, ExerciseResult>,
}

impl SessionCompletion {
  /// Exercise logs in execution order, ready for submission
  pub fn to_logs(&self) -> Vec<ExerciseLog> {
    let mut entries: Vec<(&i64, &ExerciseResult)> = self.exercises.iter().collect();
    entries.sort_by_key(|(_, r)| r.order_number);

    entries
      .into_iter()
      .map(|(&exercise_id, result)| ExerciseLog {
        exercise_name: Some(result.exercise_name.clone()),
        starting_weight: result.starting_weight,
        is_completed: result.is_completed,
        ..ExerciseLog::new(exercise_id)
      })
      .collect()
  }
}
