//! How much of a plan has actually been trained.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::MAX_WEEK_DURATION;
use crate::models::{WorkoutPlan, WorkoutSession};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekAdherence {
    pub week: i64,
    pub expected: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAdherence {
    pub plan_id: i64,
    pub expected_sessions: usize,
    pub completed_sessions: usize,
    pub adherence_pct: f32,
    pub weeks: Vec<WeekAdherence>,
    /// Highest week with at least one completed session
    pub current_week: Option<i64>,
}

impl PlanAdherence {
    /// Every training day is expected once per plan week. Repeating a day in
    /// the same week counts once; sessions for other plans, unknown days or
    /// out-of-range weeks are ignored.
    pub fn compute(plan: &WorkoutPlan, training_day_ids: &[i64], sessions: &[WorkoutSession]) -> Self {
        let days: HashSet<i64> = training_day_ids.iter().copied().collect();
        let weeks = plan.week_duration.clamp(0, MAX_WEEK_DURATION);

        let done: HashSet<(i64, i64)> = sessions
            .iter()
            .filter(|s| s.is_completed && s.plan_id == plan.id)
            .filter(|s| days.contains(&s.training_day_id) && plan.contains_week(s.week_number))
            .map(|s| (s.training_day_id, s.week_number))
            .collect();

        let per_week = days.len();
        let week_rows: Vec<WeekAdherence> = (1..=weeks)
            .map(|week| WeekAdherence {
                week,
                expected: per_week,
                completed: done.iter().filter(|(_, w)| *w == week).count(),
            })
            .collect();

        let expected_sessions = per_week.saturating_mul(week_rows.len());
        let completed_sessions = done.len();
        let adherence_pct = if expected_sessions > 0 {
            completed_sessions as f32 / expected_sessions as f32
        } else {
            1.0
        };

        Self {
            plan_id: plan.id,
            expected_sessions,
            completed_sessions,
            adherence_pct,
            weeks: week_rows,
            current_week: done.iter().map(|(_, w)| *w).max(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_sessions >= self.expected_sessions
    }
}
