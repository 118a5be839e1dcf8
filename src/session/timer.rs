//! One-second tick source for the rest timer.
//!
//! The driver owns at most one tick task. Every operation that changes the
//! timer aborts the pending task before touching state, and each task only
//! applies ticks for the timer generation it was spawned for. Dropping the
//! driver aborts the task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

use super::{SessionCompletion, SessionRunner, TimerState};

const TICK: Duration = Duration::from_secs(1);

pub struct RestTimerDriver {
  runner: Arc<Mutex<SessionRunner>>,
  tick_task: Option<JoinHandle<()>>,
  snapshots: watch::Sender<TimerState>,
}

fn lock(runner: &Mutex<SessionRunner>) -> MutexGuard<'_, SessionRunner> {
  // State stays consistent across a panicking holder; every mutation is a single step
  runner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RestTimerDriver {
  pub fn new(runner: SessionRunner) -> Self {
    let (snapshots, _) = watch::channel(runner.timer());
    Self {
      runner: Arc::new(Mutex::new(runner)),
      tick_task: None,
      snapshots,
    }
  }

  /// Observe timer changes, including every tick
  pub fn subscribe(&self) -> watch::Receiver<TimerState> {
    self.snapshots.subscribe()
  }

  /// Read the runner state
  pub fn with_runner<R>(&self, f: impl FnOnce(&SessionRunner) -> R) -> R {
    f(&lock(&self.runner))
  }

  pub fn timer(&self) -> TimerState {
    lock(&self.runner).timer()
  }

  pub fn has_pending_tick(&self) -> bool {
    self.tick_task.as_ref().is_some_and(|t| !t.is_finished())
  }

  /// ---------------------------------------------------------------------------
  /// Operations (must be called inside a tokio runtime)
  /// ---------------------------------------------------------------------------

  pub fn start_timer(&mut self) {
    self.cancel_pending();
    let generation = lock(&self.runner).start_timer();
    self.publish();
    self.schedule(generation);
  }

  pub fn stop_timer(&mut self) {
    self.cancel_pending();
    lock(&self.runner).stop_timer();
    self.publish();
  }

  pub fn reset_timer(&mut self) {
    self.cancel_pending();
    lock(&self.runner).reset_timer();
    self.publish();
  }

  /// A set that does not restart the timer leaves any running countdown alone
  pub fn record_set(&mut self) -> bool {
    let (started, generation) = {
      let mut runner = lock(&self.runner);
      let started = runner.record_set();
      (started, runner.generation())
    };
    if started {
      self.cancel_pending();
      self.schedule(generation);
    }
    self.publish();
    started
  }

  /// A no-op move at the last exercise keeps the countdown ticking
  pub fn advance(&mut self) -> bool {
    let moved = lock(&self.runner).advance();
    self.after_move(moved)
  }

  /// A no-op move at the first exercise keeps the countdown ticking
  pub fn retreat(&mut self) -> bool {
    let moved = lock(&self.runner).retreat();
    self.after_move(moved)
  }

  fn after_move(&mut self, moved: bool) -> bool {
    if moved {
      self.cancel_pending();
      self.publish();
    }
    moved
  }

  pub fn set_weight(&mut self, value: impl Into<String>) {
    lock(&self.runner).set_weight(value);
  }

  /// Stop ticking and hand back the completion payload
  pub fn complete(mut self) -> SessionCompletion {
    self.shutdown();
    let completion = lock(&self.runner).completion();
    completion
  }

  /// Release the tick task. Safe to call repeatedly.
  pub fn shutdown(&mut self) {
    self.cancel_pending();
  }

  fn cancel_pending(&mut self) {
    if let Some(task) = self.tick_task.take() {
      if !task.is_finished() {
        debug!("Cancelling pending rest timer tick");
      }
      task.abort();
    }
  }

  fn publish(&self) {
    self.snapshots.send_replace(self.timer());
  }

  fn schedule(&mut self, generation: u64) {
    let runner = Arc::clone(&self.runner);
    let snapshots = self.snapshots.clone();

    self.tick_task = Some(tokio::spawn(async move {
      let mut ticks = interval_at(Instant::now() + TICK, TICK);
      loop {
        ticks.tick().await;
        let (applied, state) = {
          let mut runner = lock(&runner);
          let applied = runner.tick_generation(generation);
          (applied, runner.timer())
        };
        if !applied {
          break;
        }
        snapshots.send_replace(state);
        if !state.running {
          debug!("Rest timer finished");
          break;
        }
      }
    }));
  }
}

impl Drop for RestTimerDriver {
  fn drop(&mut self) {
    self.shutdown();
  }
}
