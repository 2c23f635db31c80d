//! Execution scheduler
//!
//! Drives the per-cycle fan-out of (symbol, strategy) tasks:
//!
//! - `runner`: the [`Scheduler`] itself and its cycle loop
//! - `pipeline`: what a single task does, from bar fetch to [`OrderIntent`](crate::common::types::OrderIntent)
//! - `task`: task records and outcomes
//! - `state`: the state machine and the [`SchedulerHandle`] used to pause, resume and stop
//! - `metrics`: counters for cycles, outcomes and pool occupancy

pub mod metrics;
pub mod pipeline;
pub mod runner;
pub mod state;
pub mod task;

pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use pipeline::PipelineContext;
pub use runner::{CycleReport, RunSummary, Scheduler};
pub use state::{SchedulerHandle, SchedulerState};
pub use task::{ExecutionTask, TaskOutcome, TaskReport, TaskState};
