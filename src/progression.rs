//! Next-Weight Suggestions
//!
//! Each exercise log records what the lifter wants to do next time
//! (gain, stay, lower). This module turns the most recent completed log of
//! every exercise into a starting weight for the next session.
//!
//! Key principles:
//! - The lifter's stated preference drives the step, not the calendar
//! - A session with unfinished sets never earns an increase
//! - Weight never goes below zero

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Exercise, NextPreference, WorkoutSession};

// ---------------------------------------------------------------------------
/// Step Configuration: How far to move the weight
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightStep {
    /// Kilograms added or removed per step
    pub increment: f64,
}

impl Default for WeightStep {
    fn default() -> Self {
        Self { increment: 2.5 }
    }
}

impl WeightStep {
    pub fn new(increment: f64) -> Result<Self, String> {
        if !increment.is_finite() || increment <= 0.0 {
            return Err(format!("Weight increment must be positive, got {}", increment));
        }
        Ok(Self { increment })
    }

    /// Get the next value in the progression
    pub fn next_value(&self, current: f64) -> f64 {
        current + self.increment
    }

    /// Get the previous value (for deloads), floored at zero
    pub fn prev_value(&self, current: f64) -> f64 {
        (current - self.increment).max(0.0)
    }
}

// ---------------------------------------------------------------------------
/// Decision: what the engine allows for the next session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionDecision {
    Increase,       // Asked to gain and finished every set
    Hold,           // Asked to stay, or gave no preference
    HoldIncomplete, // Asked to gain but left sets unfinished
    Decrease,       // Asked to lower
    NoHistory,      // No completed log with a weight yet
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSuggestion {
    pub exercise_id: i64,
    pub exercise_name: String,
    pub last_weight: Option<f64>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub preference: Option<NextPreference>,
    pub decision: SuggestionDecision,
    pub suggested_weight: Option<f64>,
    pub reason: String,
}

struct LastLog {
    weight: f64,
    completed_at: Option<DateTime<Utc>>,
    preference: Option<NextPreference>,
    finished_all_sets: bool,
}

/// Most recent completed session wins; undated or equal timestamps go by
/// encounter order, matching the progress aggregator.
fn last_log_for(exercise_id: i64, sessions: &[WorkoutSession]) -> Option<LastLog> {
    let mut best: Option<LastLog> = None;

    for session in sessions.iter().filter(|s| s.is_completed) {
        for log in session.exercise_logs.iter().filter(|l| l.exercise_id == exercise_id) {
            let Some(weight) = log.starting_weight else {
                continue;
            };
            let newer = match &best {
                None => true,
                Some(current) => match (session.completed_at, current.completed_at) {
                    (Some(candidate), Some(existing)) => candidate >= existing,
                    _ => true,
                },
            };
            if newer {
                best = Some(LastLog {
                    weight,
                    completed_at: session.completed_at,
                    preference: log.next_preference,
                    finished_all_sets: log.is_completed,
                });
            }
        }
    }

    best
}

/// Suggest the next starting weight for each exercise, in the given order
pub fn suggest_next_weights(
    exercises: &[Exercise],
    sessions: &[WorkoutSession],
    step: &WeightStep,
) -> Vec<WeightSuggestion> {
    exercises
        .iter()
        .map(|exercise| {
            let last = last_log_for(exercise.id, sessions);

            let (decision, suggested_weight, reason) = match &last {
                None => (
                    SuggestionDecision::NoHistory,
                    None,
                    "No recorded weight yet".to_string(),
                ),
                Some(log) => match log.preference {
                    Some(NextPreference::Gain) if log.finished_all_sets => (
                        SuggestionDecision::Increase,
                        Some(step.next_value(log.weight)),
                        format!("Adding {} kg as requested", step.increment),
                    ),
                    Some(NextPreference::Gain) => (
                        SuggestionDecision::HoldIncomplete,
                        Some(log.weight),
                        "Last session had unfinished sets, holding weight".to_string(),
                    ),
                    Some(NextPreference::Lower) => (
                        SuggestionDecision::Decrease,
                        Some(step.prev_value(log.weight)),
                        format!("Removing {} kg as requested", step.increment),
                    ),
                    Some(NextPreference::Stay) => (
                        SuggestionDecision::Hold,
                        Some(log.weight),
                        "Staying at the same weight as requested".to_string(),
                    ),
                    None => (
                        SuggestionDecision::Hold,
                        Some(log.weight),
                        "No preference recorded, holding weight".to_string(),
                    ),
                },
            };

            WeightSuggestion {
                exercise_id: exercise.id,
                exercise_name: exercise.name.clone(),
                last_weight: last.as_ref().map(|l| l.weight),
                last_completed_at: last.as_ref().and_then(|l| l.completed_at),
                preference: last.as_ref().and_then(|l| l.preference),
                decision,
                suggested_weight,
                reason,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{datetime_days_ago, mock_exercise, mock_log, mock_session};

    fn log_with(weight: f64, preference: Option<NextPreference>, finished: bool) -> crate::models::ExerciseLog {
        let mut log = mock_log(1, "Squat", Some(weight));
        log.next_preference = preference;
        log.is_completed = finished;
        log
    }

    fn suggest(logs: Vec<crate::models::ExerciseLog>) -> WeightSuggestion {
        let sessions = vec![mock_session(1, 10, 1, Some(datetime_days_ago(2)), logs)];
        let exercises = vec![mock_exercise(1, 1, "Squat", 3, 90)];
        suggest_next_weights(&exercises, &sessions, &WeightStep::default()).remove(0)
    }

    #[test]
    fn test_gain_adds_increment() {
        let s = suggest(vec![log_with(100.0, Some(NextPreference::Gain), true)]);
        assert_eq!(s.decision, SuggestionDecision::Increase);
        assert_eq!(s.suggested_weight, Some(102.5));
        assert_eq!(s.last_weight, Some(100.0));
    }

    #[test]
    fn test_gain_with_unfinished_sets_holds() {
        let s = suggest(vec![log_with(100.0, Some(NextPreference::Gain), false)]);
        assert_eq!(s.decision, SuggestionDecision::HoldIncomplete);
        assert_eq!(s.suggested_weight, Some(100.0));
    }

    #[test]
    fn test_stay_and_missing_preference_hold() {
        let s = suggest(vec![log_with(60.0, Some(NextPreference::Stay), true)]);
        assert_eq!(s.decision, SuggestionDecision::Hold);
        assert_eq!(s.suggested_weight, Some(60.0));

        let s = suggest(vec![log_with(60.0, None, true)]);
        assert_eq!(s.decision, SuggestionDecision::Hold);
        assert_eq!(s.preference, None);
    }

    #[test]
    fn test_lower_is_floored_at_zero() {
        let s = suggest(vec![log_with(40.0, Some(NextPreference::Lower), true)]);
        assert_eq!(s.decision, SuggestionDecision::Decrease);
        assert_eq!(s.suggested_weight, Some(37.5));

        let s = suggest(vec![log_with(1.0, Some(NextPreference::Lower), true)]);
        assert_eq!(s.suggested_weight, Some(0.0));
    }

    #[test]
    fn test_no_history() {
        let exercises = vec![mock_exercise(5, 1, "Dip", 3, 60)];
        let suggestions = suggest_next_weights(&exercises, &[], &WeightStep::default());
        assert_eq!(suggestions[0].decision, SuggestionDecision::NoHistory);
        assert_eq!(suggestions[0].suggested_weight, None);
    }

    #[test]
    fn test_most_recent_completed_session_is_used() {
        let older = log_with(80.0, Some(NextPreference::Gain), true);
        let newer = log_with(85.0, Some(NextPreference::Stay), true);
        let mut unfinished_session = mock_session(3, 10, 3, Some(datetime_days_ago(0)), vec![log_with(200.0, None, true)]);
        unfinished_session.is_completed = false;

        let sessions = vec![
            mock_session(2, 10, 2, Some(datetime_days_ago(3)), vec![newer]),
            mock_session(1, 10, 1, Some(datetime_days_ago(10)), vec![older]),
            unfinished_session,
        ];
        let exercises = vec![mock_exercise(1, 1, "Squat", 3, 90)];
        let s = &suggest_next_weights(&exercises, &sessions, &WeightStep::default())[0];

        assert_eq!(s.last_weight, Some(85.0));
        assert_eq!(s.suggested_weight, Some(85.0));
    }

    #[test]
    fn test_logs_without_weight_are_skipped() {
        let mut blank = mock_log(1, "Squat", None);
        blank.next_preference = Some(NextPreference::Gain);
        let sessions = vec![
            mock_session(1, 10, 1, Some(datetime_days_ago(5)), vec![log_with(70.0, Some(NextPreference::Stay), true)]),
            mock_session(2, 10, 2, Some(datetime_days_ago(1)), vec![blank]),
        ];
        let exercises = vec![mock_exercise(1, 1, "Squat", 3, 90)];
        let s = &suggest_next_weights(&exercises, &sessions, &WeightStep::default())[0];
        assert_eq!(s.suggested_weight, Some(70.0));
    }

    #[test]
    fn test_custom_step() {
        assert!(WeightStep::new(0.0).is_err());
        assert!(WeightStep::new(-1.0).is_err());
        let step = WeightStep::new(5.0).unwrap();
        assert_eq!(step.next_value(100.0), 105.0);
        assert_eq!(step.prev_value(3.0), 0.0);
    }
}
