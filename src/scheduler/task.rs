//! Execution tasks and their outcomes

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::common::errors::SchedulerError;
use crate::common::types::OrderIntent;
use crate::config::StrategySettings;
use crate::scoring::QualityScore;
use crate::strategy::StrategyKind;

/// Lifecycle of one (symbol, strategy) evaluation within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    TimedOut,
    Failed,
    /// Never ran: the cycle was paused or stopped first
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Running)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::TimedOut => "timed_out",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One unit of work, created at dispatch and discarded with the cycle
#[derive(Debug, Clone)]
pub struct ExecutionTask {
    pub id: u64,
    pub symbol: String,
    pub strategy: StrategyKind,
    /// Copied from the cycle's config snapshot at dispatch
    pub params: StrategySettings,
    pub deadline: Instant,
    pub state: TaskState,
}

impl ExecutionTask {
    pub fn new(
        id: u64,
        symbol: impl Into<String>,
        strategy: StrategyKind,
        params: StrategySettings,
        deadline: Instant,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            strategy,
            params,
            deadline,
            state: TaskState::Pending,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// How a task ended
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// The pipeline ran to the end. A direction without a valid TP/SL leaves
    /// `intent` empty and records why in `risk_error`; a direction held back
    /// by a market filter records the filter's reason in `held`.
    Completed {
        quality: QualityScore,
        intent: Option<OrderIntent>,
        risk_error: Option<SchedulerError>,
        held: Option<String>,
    },
    TimedOut,
    Failed(SchedulerError),
    Cancelled,
}

impl TaskOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Completed { .. } => TaskState::Completed,
            TaskOutcome::TimedOut => TaskState::TimedOut,
            TaskOutcome::Failed(_) => TaskState::Failed,
            TaskOutcome::Cancelled => TaskState::Cancelled,
        }
    }

    pub fn intent(&self) -> Option<&OrderIntent> {
        match self {
            TaskOutcome::Completed { intent, .. } => intent.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SchedulerError> {
        match self {
            TaskOutcome::Failed(err) => Some(err),
            TaskOutcome::Completed { risk_error, .. } => risk_error.as_ref(),
            _ => None,
        }
    }
}

/// A finished task as reported back to the cycle
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task_id: u64,
    pub symbol: String,
    pub strategy: StrategyKind,
    pub outcome: TaskOutcome,
    pub elapsed: Duration,
}

impl TaskReport {
    pub fn state(&self) -> TaskState {
        self.outcome.state()
    }

    pub fn cancelled(task_id: u64, symbol: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            task_id,
            symbol: symbol.into(),
            strategy,
            outcome: TaskOutcome::Cancelled,
            elapsed: Duration::ZERO,
        }
    }
}
