pub mod plan;
pub mod session;

pub use plan::{Exercise, Tempo, TrainingDay, WorkoutPlan};
pub use session::{ExerciseLog, NextPreference, WorkoutSession};
