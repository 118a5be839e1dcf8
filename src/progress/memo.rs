//! Recompute-on-change wrapper around [`compute_progress`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::models::WorkoutSession;

use super::{compute_progress, ProgressError, TrainingDayProgress};

/// Caches the last aggregation keyed by an input fingerprint.
#[derive(Debug, Default)]
pub struct ProgressMemo {
    cached: Option<(u64, Vec<TrainingDayProgress>)>,
    computations: usize,
}

impl ProgressMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the aggregation for `sessions`, recomputing only when the
    /// fields that feed the aggregator changed since the previous call.
    pub fn get_or_compute(
        &mut self,
        sessions: &[WorkoutSession],
        week_duration: i64,
    ) -> Result<&[TrainingDayProgress], ProgressError> {
        let key = fingerprint(sessions, week_duration);

        let stale = !matches!(&self.cached, Some((k, _)) if *k == key);
        if stale {
            let output = compute_progress(sessions, week_duration)?;
            self.computations += 1;
            self.cached = Some((key, output));
        }

        Ok(match &self.cached {
            Some((_, output)) => output.as_slice(),
            None => &[],
        })
    }

    /// How many times the aggregator actually ran
    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// Hash of everything the aggregator reads, in iteration order
/// (encounter order decides timestamp ties).
pub fn fingerprint(sessions: &[WorkoutSession], week_duration: i64) -> u64 {
    let mut hasher = DefaultHasher::new();
    week_duration.hash(&mut hasher);
    sessions.len().hash(&mut hasher);

    for session in sessions {
        session.training_day_id.hash(&mut hasher);
        session.training_day_name.hash(&mut hasher);
        session.week_number.hash(&mut hasher);
        session.is_completed.hash(&mut hasher);
        session.completed_at.hash(&mut hasher);

        session.exercise_logs.len().hash(&mut hasher);
        for log in &session.exercise_logs {
            log.exercise_id.hash(&mut hasher);
            log.exercise_name.hash(&mut hasher);
            log.starting_weight.map(f64::to_bits).hash(&mut hasher);
        }
    }

    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_log, mock_session};

    #[test]
    fn test_memo_reuses_unchanged_input() {
        let sessions = vec![mock_session(1, 10, 1, None, vec![mock_log(100, "Squat", Some(100.0))])];
        let mut memo = ProgressMemo::new();

        let first = memo.get_or_compute(&sessions, 4).unwrap().to_vec();
        let second = memo.get_or_compute(&sessions.clone(), 4).unwrap().to_vec();

        assert_eq!(first, second);
        assert_eq!(memo.computations(), 1);
    }

    #[test]
    fn test_memo_recomputes_on_change() {
        let mut sessions = vec![mock_session(1, 10, 1, None, vec![mock_log(100, "Squat", Some(100.0))])];
        let mut memo = ProgressMemo::new();
        memo.get_or_compute(&sessions, 4).unwrap();

        sessions[0].exercise_logs[0].starting_weight = Some(102.5);
        let output = memo.get_or_compute(&sessions, 4).unwrap();
        assert_eq!(output[0].exercises[0].data_points[0].weight, Some(102.5));
        assert_eq!(memo.computations(), 2);

        memo.get_or_compute(&sessions, 5).unwrap();
        assert_eq!(memo.computations(), 3);

        memo.invalidate();
        memo.get_or_compute(&sessions, 5).unwrap();
        assert_eq!(memo.computations(), 4);
    }

    #[test]
    fn test_memo_ignores_fields_aggregator_does_not_read() {
        let mut sessions = vec![mock_session(1, 10, 1, None, vec![mock_log(100, "Squat", Some(100.0))])];
        let before = fingerprint(&sessions, 4);
        sessions[0].notes = Some("felt strong".to_string());
        assert_eq!(before, fingerprint(&sessions, 4));
    }

    #[test]
    fn test_memo_propagates_errors() {
        let mut memo = ProgressMemo::new();
        assert!(memo.get_or_compute(&[], 0).is_err());
        assert_eq!(memo.computations(), 0);
    }
}
