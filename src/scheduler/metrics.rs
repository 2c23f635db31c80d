//! Scheduler health counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Lock-free counters shared by the scheduler and its tasks
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    cycles: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_timed_out: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_cancelled: AtomicU64,
    intents_emitted: AtomicU64,
    intents_suppressed: AtomicU64,
    intents_rejected: AtomicU64,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

/// Point-in-time copy of [`SchedulerMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub tasks_completed: u64,
    pub tasks_timed_out: u64,
    pub tasks_failed: u64,
    pub tasks_cancelled: u64,
    pub intents_emitted: u64,
    pub intents_suppressed: u64,
    pub intents_rejected: u64,
    pub running: usize,
    pub peak_running: usize,
}

/// Marks a task as running until dropped
pub struct RunningGuard<'a> {
    metrics: &'a SchedulerMetrics,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.metrics.running.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new cycle number, starting at 1
    pub fn next_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn enter_running(&self) -> RunningGuard<'_> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(now, Ordering::SeqCst);
        RunningGuard { metrics: self }
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }

    pub fn record_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timed_out(&self) {
        self.tasks_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self, n: usize) {
        self.tasks_cancelled.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_emitted(&self) {
        self.intents_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.intents_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.intents_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_timed_out: self.tasks_timed_out.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            intents_emitted: self.intents_emitted.load(Ordering::Relaxed),
            intents_suppressed: self.intents_suppressed.load(Ordering::Relaxed),
            intents_rejected: self.intents_rejected.load(Ordering::Relaxed),
            running: self.running(),
            peak_running: self.peak_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_guard_tracks_peak() {
        let metrics = SchedulerMetrics::new();
        {
            let _a = metrics.enter_running();
            let _b = metrics.enter_running();
            assert_eq!(metrics.running(), 2);
        }
        let _c = metrics.enter_running();
        assert_eq!(metrics.running(), 1);
        assert_eq!(metrics.peak_running(), 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = SchedulerMetrics::new();
        assert_eq!(metrics.next_cycle(), 1);
        metrics.record_timed_out();
        metrics.record_cancelled(3);
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["cycles"], 1);
        assert_eq!(json["tasks_timed_out"], 1);
        assert_eq!(json["tasks_cancelled"], 3);
    }
}
