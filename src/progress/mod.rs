//! Progress Aggregation
//!
//! Turns completed workout session history into chart-ready series:
//! - grouped by training day, then by exercise
//! - one slot per plan week, holding the latest observation for that week
//! - summary statistics (min/max/latest/percent change) over populated slots
//!
//! Everything here is a pure function of its input. Callers that re-render
//! often should go through [`ProgressMemo`] instead of recomputing.

pub mod adherence;
pub mod memo;

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::WorkoutSession;

pub use adherence::{PlanAdherence, WeekAdherence};
pub use memo::ProgressMemo;

// ---------------------------------------------------------------------------
/// Output types
// ---------------------------------------------------------------------------

/// One week slot of an exercise series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub week: i64,
    pub weight: Option<f64>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProgress {
    pub exercise_id: i64,
    pub exercise_name: String,
    /// Always `week_duration` entries, weeks 1..=week_duration
    pub data_points: Vec<DataPoint>,
    pub max_weight: f64,
    pub min_weight: f64,
    pub latest_weight: Option<f64>,
    pub progress_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingDayProgress {
    pub training_day_id: i64,
    pub training_day_name: String,
    pub exercises: Vec<ExerciseProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    #[error("Week duration must be between 1 and {max}, got {0}", max = MAX_WEEK_DURATION)]
    InvalidWeekDuration(i64),
}

/// Longest plan the aggregator will lay out (ten years of weeks)
pub const MAX_WEEK_DURATION: i64 = 520;

// ---------------------------------------------------------------------------
/// Grouping
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Observation {
    week: i64,
    weight: Option<f64>,
    date: Option<DateTime<Utc>>,
}

struct ExerciseGroup {
    exercise_id: i64,
    name: Option<String>,
    observations: Vec<Observation>,
}

struct DayGroup {
    training_day_id: i64,
    label: Option<String>,
    exercises: Vec<ExerciseGroup>,
    exercise_index: HashMap<i64, usize>,
}

fn non_empty(name: &Option<String>) -> Option<String> {
    name.as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
}

fn group_sessions(sessions: &[WorkoutSession]) -> Vec<DayGroup> {
    let mut days: Vec<DayGroup> = Vec::new();
    let mut day_index: HashMap<i64, usize> = HashMap::new();

    for session in sessions.iter().filter(|s| s.is_completed) {
        let idx = *day_index.entry(session.training_day_id).or_insert_with(|| {
            days.push(DayGroup {
                training_day_id: session.training_day_id,
                label: None,
                exercises: Vec::new(),
                exercise_index: HashMap::new(),
            });
            days.len() - 1
        });
        let day = &mut days[idx];

        if day.label.is_none() {
            day.label = non_empty(&session.training_day_name);
        }

        for log in &session.exercise_logs {
            let ex_idx = match day.exercise_index.get(&log.exercise_id) {
                Some(&i) => i,
                None => {
                    day.exercises.push(ExerciseGroup {
                        exercise_id: log.exercise_id,
                        name: None,
                        observations: Vec::new(),
                    });
                    let i = day.exercises.len() - 1;
                    day.exercise_index.insert(log.exercise_id, i);
                    i
                }
            };
            let exercise = &mut day.exercises[ex_idx];

            if exercise.name.is_none() {
                exercise.name = non_empty(&log.exercise_name);
            }
            exercise.observations.push(Observation {
                week: session.week_number,
                weight: log.starting_weight,
                date: session.completed_at,
            });
        }
    }

    days
}

// ---------------------------------------------------------------------------
/// Series and statistics
// ---------------------------------------------------------------------------

/// Latest completion wins. Equal or missing timestamps fall back to
/// encounter order, so the later candidate replaces the current one.
fn supersedes(candidate: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
    match (candidate, current) {
        (Some(c), Some(k)) => c >= k,
        _ => true,
    }
}

fn build_series(observations: &[Observation], week_duration: usize) -> Vec<DataPoint> {
    let mut slots: Vec<Option<Observation>> = vec![None; week_duration];

    for obs in observations {
        if obs.week < 1 || obs.week as u64 > week_duration as u64 {
            continue;
        }
        let slot = &mut slots[(obs.week - 1) as usize];
        let replace = match slot {
            Some(current) => supersedes(obs.date, current.date),
            None => true,
        };
        if replace {
            *slot = Some(*obs);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| DataPoint {
            week: i as i64 + 1,
            weight: slot.and_then(|o| o.weight),
            date: slot.and_then(|o| o.date),
        })
        .collect()
}

fn latest_populated(populated: &[(&DataPoint, f64)]) -> Option<f64> {
    let mut best: Option<(&DataPoint, f64)> = None;
    for &(point, weight) in populated {
        let take = match best {
            None => true,
            Some((current, _)) => match (point.date, current.date) {
                (Some(p), Some(c)) => p >= c,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => true,
            },
        };
        if take {
            best = Some((point, weight));
        }
    }
    best.map(|(_, w)| w)
}

fn summarize(exercise_id: i64, exercise_name: String, data_points: Vec<DataPoint>) -> ExerciseProgress {
    let populated: Vec<(&DataPoint, f64)> = data_points
        .iter()
        .filter_map(|p| p.weight.map(|w| (p, w)))
        .collect();

    let (max_weight, min_weight) = if populated.is_empty() {
        (0.0, 0.0)
    } else {
        populated.iter().fold((f64::MIN, f64::MAX), |(max, min), &(_, w)| {
            (max.max(w), min.min(w))
        })
    };

    let latest_weight = latest_populated(&populated);

    // First and last by week order, not by date
    let progress_percentage = match (populated.first(), populated.last()) {
        (Some(&(_, first)), Some(&(_, last))) if populated.len() >= 2 && first != 0.0 => {
            Some((last - first) / first * 100.0)
        }
        _ => None,
    };

    ExerciseProgress {
        exercise_id,
        exercise_name,
        data_points,
        max_weight,
        min_weight,
        latest_weight,
        progress_percentage,
    }
}

/// Primary collation key: decomposed, accents stripped, lowercased.
fn base_letters(label: &str) -> String {
    label
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Locale-style ordering in three levels, like a root collator:
/// base letters, then accents (unaccented first), then case (lowercase first).
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(&base_letters(b))
        .then_with(|| {
            let accented = |s: &str| s.nfd().flat_map(char::to_lowercase).collect::<String>();
            accented(a).cmp(&accented(b))
        })
        .then_with(|| b.cmp(a))
}

// ---------------------------------------------------------------------------
/// Entry point
// ---------------------------------------------------------------------------

/// Aggregate completed sessions into per-training-day, per-exercise weekly
/// weight series of exactly `week_duration` slots.
///
/// Incomplete sessions are ignored. Observations whose week falls outside
/// `1..=week_duration` are dropped.
pub fn compute_progress(
    sessions: &[WorkoutSession],
    week_duration: i64,
) -> Result<Vec<TrainingDayProgress>, ProgressError> {
    if !(1..=MAX_WEEK_DURATION).contains(&week_duration) {
        return Err(ProgressError::InvalidWeekDuration(week_duration));
    }
    let slots = usize::try_from(week_duration)
        .map_err(|_| ProgressError::InvalidWeekDuration(week_duration))?;

    let mut progress: Vec<TrainingDayProgress> = group_sessions(sessions)
        .into_iter()
        .map(|day| {
            let mut exercises: Vec<ExerciseProgress> = day
                .exercises
                .into_iter()
                .map(|ex| {
                    let name = ex.name.unwrap_or_else(|| ex.exercise_id.to_string());
                    let series = build_series(&ex.observations, slots);
                    summarize(ex.exercise_id, name, series)
                })
                .collect();
            exercises.sort_by(|a, b| compare_labels(&a.exercise_name, &b.exercise_name));

            TrainingDayProgress {
                training_day_id: day.training_day_id,
                training_day_name: day
                    .label
                    .unwrap_or_else(|| format!("Training day {}", day.training_day_id)),
                exercises,
            }
        })
        .collect();

    progress.sort_by(|a, b| compare_labels(&a.training_day_name, &b.training_day_name));
    Ok(progress)
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
