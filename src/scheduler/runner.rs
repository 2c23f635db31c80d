//! Execution Scheduler
//!
//! One cycle:
//!
//! ```text
//! config snapshot ──► batches of `batch_size` symbols × active strategies
//!   for each batch (strictly in sequence):
//!     yield ──► spawn one task per pair ──► Semaphore(pool_size) ──► timeout_at(deadline, pipeline)
//!     join in completion order ──► TaskReport
//! collect intents (completion order) ──► dedup ──► OrderSink
//! ```
//!
//! A `ConnectionLost` failure pauses the scheduler: the batch in flight
//! finishes, later batches are cancelled. An emergency stop aborts everything
//! in flight and returns to `Idle` without collecting.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep, sleep_until, timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::common::errors::{Result, SchedulerError};
use crate::common::traits::{
    ConfigSource, CurrencyConverter, InstrumentMetadataSource, MarketDataSource, OrderSink,
};
use crate::common::types::OrderIntent;
use crate::config::ConfigSnapshot;
use crate::risk::RiskResolver;
use crate::scheduler::metrics::{MetricsSnapshot, SchedulerMetrics};
use crate::scheduler::pipeline::{self, PipelineContext};
use crate::scheduler::state::{SchedulerHandle, SchedulerState};
use crate::scheduler::task::{ExecutionTask, TaskOutcome, TaskReport, TaskState};
use crate::scoring::QualityScorer;
use crate::strategy::{
    session_at, DedupSettings, SignalDeduplicator, SignalKey, StrategyKind, TradingSession,
};

/// Interval used before any cycle has reported one
const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_millis(1000);

/// What happened during one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub session: Option<TradingSession>,
    /// Finished tasks in completion order, then any cancelled ones
    pub tasks: Vec<TaskReport>,
    /// Intents accepted by the sink, in emission order
    pub intents: Vec<OrderIntent>,
    /// Directions a market filter kept from becoming intents
    pub held: usize,
    /// Intents dropped as duplicates
    pub suppressed: usize,
    /// Intents the sink refused
    pub rejected: usize,
    /// Ended by an emergency stop
    pub aborted: bool,
    /// Scheduler was paused when the cycle ended
    pub paused: bool,
    /// Nothing ran because the scheduler was already paused
    pub skipped: bool,
    /// Interval the configuration asks for before the next cycle
    pub interval: Option<Duration>,
}

impl CycleReport {
    fn new(cycle: u64) -> Self {
        Self {
            cycle,
            started_at: Utc::now(),
            session: None,
            tasks: Vec::new(),
            intents: Vec::new(),
            held: 0,
            suppressed: 0,
            rejected: 0,
            aborted: false,
            paused: false,
            skipped: false,
            interval: None,
        }
    }

    pub fn count(&self, state: TaskState) -> usize {
        self.tasks.iter().filter(|t| t.state() == state).count()
    }
}

/// Totals over [`Scheduler::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub intents: usize,
    pub timed_out: usize,
    pub failed: usize,
    pub aborted: bool,
}

impl RunSummary {
    fn absorb(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.intents += report.intents.len();
        self.timed_out += report.count(TaskState::TimedOut);
        self.failed += report.count(TaskState::Failed);
        self.aborted |= report.aborted;
    }
}

/// The orchestrator
///
/// All collaborators are shared trait objects, so the same scheduler runs
/// against a live bridge, the paper implementations, or test fakes.
pub struct Scheduler {
    market: Arc<dyn MarketDataSource>,
    instruments: Arc<dyn InstrumentMetadataSource>,
    converter: Option<Arc<dyn CurrencyConverter>>,
    sink: Arc<dyn OrderSink>,
    config: Arc<dyn ConfigSource>,
    dedup: Mutex<SignalDeduplicator>,
    metrics: Arc<SchedulerMetrics>,
    handle: SchedulerHandle,
    next_task_id: AtomicU64,
}

impl Scheduler {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        instruments: Arc<dyn InstrumentMetadataSource>,
        sink: Arc<dyn OrderSink>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            market,
            instruments,
            converter: None,
            sink,
            config,
            dedup: Mutex::new(SignalDeduplicator::new(DedupSettings::default())),
            metrics: Arc::new(SchedulerMetrics::new()),
            handle: SchedulerHandle::new(),
            next_task_id: AtomicU64::new(1),
        }
    }

    /// Exchange-rate source for currency-denominated TP/SL
    pub fn with_converter(mut self, converter: Arc<dyn CurrencyConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_dedup(mut self, settings: DedupSettings) -> Self {
        self.dedup = Mutex::new(SignalDeduplicator::new(settings));
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.handle.state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn emergency_stop(&self) {
        self.handle.emergency_stop();
    }

    pub fn reset_stop(&self) {
        self.handle.reset_stop();
    }

    pub fn resume(&self) {
        self.handle.resume();
    }

    fn next_id(&self) -> u64 {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    fn pipeline_context(
        &self,
        snapshot: &ConfigSnapshot,
        session: Option<TradingSession>,
        now: DateTime<Utc>,
    ) -> PipelineContext {
        let mut resolver = RiskResolver::new(snapshot.account_currency.clone());
        if let Some(converter) = &self.converter {
            resolver = resolver.with_converter(Arc::clone(converter));
        }
        PipelineContext {
            market: Arc::clone(&self.market),
            instruments: Arc::clone(&self.instruments),
            resolver,
            scorer: QualityScorer::new(snapshot.threshold, snapshot.min_quality_score),
            timeframe: snapshot.scheduler.timeframe,
            bar_count: snapshot.scheduler.bar_count,
            session,
            now,
            news: snapshot.news.clone(),
            spread: snapshot.spread.clone(),
            adaptive: snapshot.adaptive.clone(),
        }
    }

    /// Run one full cycle over every configured symbol and active strategy
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::new(self.metrics.next_cycle());

        if self.handle.is_stop_requested() {
            report.aborted = true;
            return Ok(report);
        }
        if self.handle.is_paused() {
            debug!(cycle = report.cycle, "Scheduler paused, cycle skipped");
            report.paused = true;
            report.skipped = true;
            return Ok(report);
        }

        // Configuration is read once; tasks get their parameters by value
        let snapshot = self.config.snapshot().await?;
        report.interval = Some(
            snapshot
                .scheduler
                .cycle_interval(&snapshot.active_strategies),
        );
        let started_at = report.started_at;
        report.session = snapshot.sessions_enabled.then(|| session_at(started_at));

        let ctx = Arc::new(self.pipeline_context(&snapshot, report.session, started_at));
        let pool = Arc::new(Semaphore::new(snapshot.scheduler.pool_size.max(1)));
        let budget = snapshot.scheduler.task_deadline();
        let batch_yield = snapshot.scheduler.batch_yield();
        let mut stop_rx = self.handle.subscribe_stop();
        let mut collected: Vec<OrderIntent> = Vec::new();

        let all_batches = snapshot.batches();
        info!(
            cycle = report.cycle,
            symbols = snapshot.symbols.len(),
            strategies = snapshot.active_strategies.len(),
            batches = all_batches.len(),
            "Cycle started"
        );

        let mut batches = all_batches.into_iter().enumerate();
        while let Some((index, batch)) = batches.next() {
            if self.handle.is_paused() {
                let remaining = batch
                    .into_iter()
                    .chain(batches.by_ref().flat_map(|(_, b)| b));
                self.cancel(&mut report, remaining);
                break;
            }

            if index > 0 {
                tokio::select! {
                    _ = sleep(batch_yield) => {}
                    _ = stop_signal(&mut stop_rx) => {
                        let remaining = batch
                            .into_iter()
                            .chain(batches.by_ref().flat_map(|(_, b)| b));
                        self.cancel(&mut report, remaining);
                        return Ok(self.abort(report));
                    }
                }
            }

            self.handle.transition(SchedulerState::Dispatching);
            let dispatched = Instant::now();
            let deadline = dispatched + budget;
            let mut in_flight: HashMap<tokio::task::Id, (u64, String, StrategyKind)> = HashMap::new();
            let mut set = JoinSet::new();
            for (symbol, strategy) in batch {
                let task = ExecutionTask::new(
                    self.next_id(),
                    symbol.clone(),
                    strategy,
                    snapshot.strategy(strategy),
                    deadline,
                );
                let task_id = task.id;

                // Clone shared handles for the spawned task
                let ctx = Arc::clone(&ctx);
                let pool = Arc::clone(&pool);
                let metrics = Arc::clone(&self.metrics);
                let handle = self.handle.clone();
                let spawned = set.spawn(execute(task, ctx, pool, metrics, handle));
                in_flight.insert(spawned.id(), (task_id, symbol, strategy));
            }
            debug!(cycle = report.cycle, batch = index, tasks = in_flight.len(), "Batch dispatched");

            self.handle.transition(SchedulerState::AwaitingCompletion);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_signal(&mut stop_rx) => {
                        set.abort_all();
                        let remaining = in_flight
                            .into_values()
                            .map(|(_, symbol, strategy)| (symbol, strategy))
                            .chain(batches.by_ref().flat_map(|(_, b)| b));
                        self.cancel(&mut report, remaining);
                        return Ok(self.abort(report));
                    }
                    joined = set.join_next_with_id() => match joined {
                        None => break,
                        Some(Ok((id, task_report))) => {
                            in_flight.remove(&id);
                            self.record(task_report, &mut report, &mut collected);
                        }
                        Some(Err(err)) => {
                            error!(error = %err, "Task panicked");
                            if let Some((task_id, symbol, strategy)) = in_flight.remove(&err.id()) {
                                let lost = TaskReport {
                                    task_id,
                                    symbol,
                                    strategy,
                                    outcome: TaskOutcome::Failed(SchedulerError::Internal(format!(
                                        "task panicked: {}",
                                        err
                                    ))),
                                    elapsed: dispatched.elapsed(),
                                };
                                self.record(lost, &mut report, &mut collected);
                            }
                        }
                    }
                }
            }
        }

        self.handle.transition(SchedulerState::Collecting);
        self.emit(collected, &mut report).await;

        report.paused = self.handle.is_paused();
        self.handle.transition(SchedulerState::Idle);
        info!(
            cycle = report.cycle,
            completed = report.count(TaskState::Completed),
            timed_out = report.count(TaskState::TimedOut),
            failed = report.count(TaskState::Failed),
            cancelled = report.count(TaskState::Cancelled),
            intents = report.intents.len(),
            suppressed = report.suppressed,
            "Cycle finished"
        );
        Ok(report)
    }

    /// Run cycles until `max_cycles` is reached or an emergency stop arrives
    pub async fn run(&self, max_cycles: Option<u64>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut stop_rx = self.handle.subscribe_stop();
        let mut interval = DEFAULT_CYCLE_INTERVAL;

        loop {
            if max_cycles.is_some_and(|max| summary.cycles >= max) || self.handle.is_stop_requested()
            {
                break;
            }
            let started = Instant::now();
            match self.run_cycle().await {
                Ok(report) => {
                    summary.absorb(&report);
                    if let Some(next) = report.interval {
                        interval = next;
                    }
                    if report.aborted {
                        break;
                    }
                }
                Err(err) => {
                    // A bad cycle never ends the loop
                    error!(error = %err, "Cycle failed");
                    summary.cycles += 1;
                }
            }
            if max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }

            tokio::select! {
                _ = sleep_until(started + interval) => {}
                _ = stop_signal(&mut stop_rx) => {
                    summary.aborted = true;
                    break;
                }
            }
        }

        info!(cycles = summary.cycles, intents = summary.intents, "Scheduler stopped");
        Ok(summary)
    }

    fn record(&self, task: TaskReport, report: &mut CycleReport, collected: &mut Vec<OrderIntent>) {
        match &task.outcome {
            TaskOutcome::Completed {
                quality,
                intent,
                risk_error,
                held,
            } => {
                self.metrics.record_completed();
                debug!(
                    symbol = %task.symbol,
                    strategy = %task.strategy,
                    score = quality.score,
                    direction = ?quality.direction,
                    "Task completed"
                );
                if let Some(err) = risk_error {
                    warn!(symbol = %task.symbol, strategy = %task.strategy, error = %err, "No intent: risk leg invalid");
                }
                if let Some(reason) = held {
                    report.held += 1;
                    info!(symbol = %task.symbol, strategy = %task.strategy, reason = %reason, "No intent: held by market filter");
                }
                if let Some(intent) = intent {
                    collected.push(intent.clone());
                }
            }
            TaskOutcome::TimedOut => {
                self.metrics.record_timed_out();
                warn!(
                    symbol = %task.symbol,
                    strategy = %task.strategy,
                    elapsed_ms = task.elapsed.as_millis() as u64,
                    "Task timed out, partial work discarded"
                );
            }
            TaskOutcome::Failed(err) => {
                self.metrics.record_failed();
                warn!(symbol = %task.symbol, strategy = %task.strategy, error = %err, "Task failed");
            }
            TaskOutcome::Cancelled => self.metrics.record_cancelled(1),
        }
        report.tasks.push(task);
    }

    fn cancel(
        &self,
        report: &mut CycleReport,
        pairs: impl IntoIterator<Item = (String, StrategyKind)>,
    ) {
        let before = report.tasks.len();
        for (symbol, strategy) in pairs {
            report
                .tasks
                .push(TaskReport::cancelled(self.next_id(), symbol, strategy));
        }
        let cancelled = report.tasks.len() - before;
        if cancelled > 0 {
            self.metrics.record_cancelled(cancelled);
            debug!(cycle = report.cycle, cancelled, "Tasks cancelled");
        }
    }

    fn abort(&self, mut report: CycleReport) -> CycleReport {
        report.aborted = true;
        self.handle.force_idle();
        warn!(cycle = report.cycle, "Cycle aborted by emergency stop");
        report
    }

    /// Dedup then submit, preserving completion order. Failed submissions are
    /// not retried.
    async fn emit(&self, intents: Vec<OrderIntent>, report: &mut CycleReport) {
        let now = Utc::now();
        for intent in intents {
            let key = SignalKey::new(
                intent.symbol.clone(),
                intent.strategy,
                intent.direction,
                intent.tags.iter().cloned(),
            );
            let verdict = match self.dedup.lock() {
                Ok(mut dedup) => dedup.check(&key, now),
                Err(poisoned) => poisoned.into_inner().check(&key, now),
            };
            if !verdict.is_unique() {
                report.suppressed += 1;
                self.metrics.record_suppressed();
                debug!(symbol = %intent.symbol, strategy = %intent.strategy, verdict = ?verdict, "Intent suppressed");
                continue;
            }

            match self.sink.submit(&intent).await {
                Ok(()) => {
                    self.metrics.record_emitted();
                    info!(
                        symbol = %intent.symbol,
                        strategy = %intent.strategy,
                        direction = %intent.direction,
                        lot = %intent.lot_size,
                        entry = %intent.entry_price,
                        tp = %intent.take_profit,
                        sl = %intent.stop_loss,
                        score = intent.quality_score,
                        "Order intent emitted"
                    );
                    report.intents.push(intent);
                }
                Err(err) => {
                    report.rejected += 1;
                    self.metrics.record_rejected();
                    warn!(symbol = %intent.symbol, error = %err, "Order sink rejected intent");
                }
            }
        }
    }
}

/// Resolves once an emergency stop is requested
async fn stop_signal(rx: &mut watch::Receiver<bool>) {
    let signalled = rx.wait_for(|stop| *stop).await.map(|_| ());
    if signalled.is_err() {
        // Handle dropped: no stop can arrive any more
        std::future::pending::<()>().await;
    }
}

/// Resolves once the scheduler is paused
async fn pause_signal(rx: &mut watch::Receiver<SchedulerState>) {
    let signalled = rx
        .wait_for(|state| *state == SchedulerState::Paused)
        .await
        .map(|_| ());
    if signalled.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run one task under the worker pool and its deadline
///
/// The deadline counts from dispatch, so time spent waiting for a permit is
/// part of the budget. An already expired deadline never reaches the pipeline,
/// and a task still waiting for a permit when the scheduler pauses is
/// cancelled.
async fn execute(
    mut task: ExecutionTask,
    ctx: Arc<PipelineContext>,
    pool: Arc<Semaphore>,
    metrics: Arc<SchedulerMetrics>,
    handle: SchedulerHandle,
) -> TaskReport {
    let started = Instant::now();
    let deadline = task.deadline;

    let outcome = if task.is_expired() {
        TaskOutcome::TimedOut
    } else {
        let work = run_with_permit(&mut task, &ctx, &pool, &metrics, &handle);
        match timeout_at(deadline, work).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => TaskOutcome::Failed(err),
            Err(_) => TaskOutcome::TimedOut,
        }
    };

    task.state = outcome.state();
    debug!(task = task.id, symbol = %task.symbol, state = %task.state, "Task finished");
    TaskReport {
        task_id: task.id,
        symbol: task.symbol,
        strategy: task.strategy,
        outcome,
        elapsed: started.elapsed(),
    }
}

async fn run_with_permit(
    task: &mut ExecutionTask,
    ctx: &PipelineContext,
    pool: &Semaphore,
    metrics: &SchedulerMetrics,
    handle: &SchedulerHandle,
) -> Result<TaskOutcome> {
    let mut state_rx = handle.subscribe_state();
    let _permit = tokio::select! {
        biased;
        _ = pause_signal(&mut state_rx) => return Ok(TaskOutcome::Cancelled),
        permit = pool.acquire() => permit
            .map_err(|_| SchedulerError::Internal("worker pool closed".to_string()))?,
    };
    let _running = metrics.enter_running();
    task.state = TaskState::Running;

    let result = pipeline::evaluate(task, ctx).await;
    // Pause while still holding the permit so no waiting task slips through
    if let Err(err) = &result {
        if err.is_connection_lost() {
            handle.pause(&err.to_string());
        }
    }
    result
}
