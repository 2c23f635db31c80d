//! Scheduler state machine and its external control handle
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//!   Idle ──► Dispatching ──► AwaitingCompletion ──► Collecting
//!            ▲    │                  │
//!            │    └──── ConnectionLost ───► Paused ──(resume)──► Idle
//!            │
//!   emergency stop: any state ──► Idle
//! ```

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Dispatching,
    AwaitingCompletion,
    Collecting,
    Paused,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Dispatching => "dispatching",
            SchedulerState::AwaitingCompletion => "awaiting_completion",
            SchedulerState::Collecting => "collecting",
            SchedulerState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Cloneable handle for pausing, resuming and stopping a scheduler from
/// another task (a control surface, a signal handler, a test)
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    state: Arc<watch::Sender<SchedulerState>>,
    stop: Arc<watch::Sender<bool>>,
}

impl Default for SchedulerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerHandle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        let (stop, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
            stop: Arc::new(stop),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn is_paused(&self) -> bool {
        self.state() == SchedulerState::Paused
    }

    /// Stop dispatching new tasks until [`resume`](Self::resume)
    pub fn pause(&self, reason: &str) {
        let previous = self.state.send_replace(SchedulerState::Paused);
        if previous != SchedulerState::Paused {
            warn!(reason, "Scheduler paused");
        }
    }

    pub fn resume(&self) {
        let mut resumed = false;
        self.state.send_if_modified(|state| {
            if *state == SchedulerState::Paused {
                *state = SchedulerState::Idle;
                resumed = true;
                true
            } else {
                false
            }
        });
        if resumed {
            info!("Scheduler resumed");
        }
    }

    /// Cancel all in-flight tasks and stop dispatching. Stays in effect until
    /// [`reset_stop`](Self::reset_stop).
    pub fn emergency_stop(&self) {
        if !self.stop.send_replace(true) {
            warn!("Emergency stop requested");
        }
    }

    pub fn reset_stop(&self) {
        self.stop.send_replace(false);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    /// Move to a running-cycle state; a pause wins over the transition
    pub(crate) fn transition(&self, next: SchedulerState) {
        self.state.send_if_modified(|state| {
            if *state == SchedulerState::Paused || *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    /// Back to Idle regardless of the current state
    pub(crate) fn force_idle(&self) {
        self.state.send_replace(SchedulerState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_blocks_transitions_until_resume() {
        let handle = SchedulerHandle::new();
        handle.transition(SchedulerState::Dispatching);
        assert_eq!(handle.state(), SchedulerState::Dispatching);

        handle.pause("connection lost");
        handle.transition(SchedulerState::Collecting);
        assert_eq!(handle.state(), SchedulerState::Paused);

        handle.resume();
        assert_eq!(handle.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_resume_only_leaves_paused() {
        let handle = SchedulerHandle::new();
        handle.transition(SchedulerState::AwaitingCompletion);
        handle.resume();
        assert_eq!(handle.state(), SchedulerState::AwaitingCompletion);
    }

    #[tokio::test]
    async fn test_stop_is_level_triggered() {
        let handle = SchedulerHandle::new();
        let mut rx = handle.subscribe_stop();
        handle.emergency_stop();
        assert!(rx.wait_for(|s| *s).await.is_ok());
        assert!(handle.is_stop_requested());
        handle.reset_stop();
        assert!(!handle.is_stop_requested());
    }
}
