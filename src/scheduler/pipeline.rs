//! Per-task pipeline
//!
//! ```text
//! fetch bars + tick + metadata ──► indicators ──► structure ──► generator
//!     ──► enhancement ──► quality score ──► (direction?) ──► news / spread / volatility
//!     ──► TP/SL ──► OrderIntent
//! ```
//!
//! Everything after the fetches is task-local and lock-free. The caller wraps
//! the whole future in the task deadline.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::errors::{Result, SchedulerError};
use crate::common::traits::{InstrumentMetadataSource, MarketDataSource};
use crate::common::types::{InstrumentMeta, LevelKind, OrderIntent, Tick, Timeframe};
use crate::indicators::{self, IndicatorSnapshot};
use crate::risk::{
    normalize_lot, AdaptiveSettings, LevelContext, MarketConditions, RiskResolver, SpreadLimits,
};
use crate::scheduler::task::{ExecutionTask, TaskOutcome};
use crate::scoring::QualityScorer;
use crate::strategy::{NewsSettings, SessionMultipliers, TradingSession};

/// Read-only inputs shared by every task of one cycle
pub struct PipelineContext {
    pub market: Arc<dyn MarketDataSource>,
    pub instruments: Arc<dyn InstrumentMetadataSource>,
    pub resolver: RiskResolver,
    pub scorer: QualityScorer,
    pub timeframe: Timeframe,
    pub bar_count: usize,
    /// Session in force for this cycle, when session scaling is on
    pub session: Option<TradingSession>,
    /// Cycle start; the clock every task of the cycle reads
    pub now: DateTime<Utc>,
    pub news: NewsSettings,
    pub spread: SpreadLimits,
    pub adaptive: AdaptiveSettings,
}

impl PipelineContext {
    fn multipliers(&self) -> SessionMultipliers {
        self.session
            .map(TradingSession::multipliers)
            .unwrap_or(SessionMultipliers {
                lot: Decimal::ONE,
                take_profit: Decimal::ONE,
                stop_loss: Decimal::ONE,
            })
    }

    fn conditions(&self, snapshot: &IndicatorSnapshot) -> Option<MarketConditions> {
        self.adaptive
            .enabled
            .then(|| MarketConditions::read(snapshot))
    }

    /// First filter that keeps `task` from trading right now
    fn hold_reason(
        &self,
        task: &ExecutionTask,
        tick: &Tick,
        meta: &InstrumentMeta,
        conditions: Option<&MarketConditions>,
    ) -> Option<String> {
        if let Some(reason) = self.news.blackout(&task.symbol, task.strategy, self.now) {
            return Some(reason);
        }
        if let Some(reason) = self.spread.check(&task.symbol, tick, meta) {
            return Some(reason);
        }
        match conditions {
            Some(c) if self.adaptive.hold_on_extreme && c.is_extreme() => {
                Some("extreme volatility".to_string())
            }
            _ => None,
        }
    }
}

/// Run the full pipeline for one task
///
/// Data and connection errors propagate and fail the task. An invalid TP/SL
/// still completes it, with the error recorded instead of an intent.
pub async fn evaluate(task: &ExecutionTask, ctx: &PipelineContext) -> Result<TaskOutcome> {
    let symbol = task.symbol.as_str();

    let bars = ctx
        .market
        .fetch_bars(symbol, ctx.timeframe, ctx.bar_count)
        .await?;
    if bars.len() < 2 {
        return Err(SchedulerError::DataUnavailable(format!(
            "{}: {} bars returned",
            symbol,
            bars.len()
        )));
    }
    let tick = ctx.market.fetch_tick(symbol).await?;
    let meta = ctx.instruments.instrument(symbol).await?;

    let snapshot = indicators::compute(&bars);
    if snapshot.insufficient_data {
        debug!(symbol, bars = bars.len(), "Partial indicator snapshot");
    }

    let price = tick.mid_f64();
    let pip_size = meta.point.to_f64().unwrap_or(0.0);
    let evaluation = ctx
        .scorer
        .evaluate(task.strategy, &snapshot, price, pip_size);
    let quality = evaluation.quality;

    let direction = match quality.direction {
        Some(direction) => direction,
        None => {
            debug!(
                symbol,
                strategy = %task.strategy,
                score = quality.score,
                agreeing = quality.agreeing,
                threshold = quality.threshold,
                "No direction"
            );
            return Ok(TaskOutcome::Completed {
                quality,
                intent: None,
                risk_error: None,
                held: None,
            });
        }
    };

    let conditions = ctx.conditions(&snapshot);
    if let Some(reason) = ctx.hold_reason(task, &tick, &meta, conditions.as_ref()) {
        debug!(symbol, strategy = %task.strategy, reason = %reason, "Direction held back");
        return Ok(TaskOutcome::Completed {
            quality,
            intent: None,
            risk_error: None,
            held: Some(reason),
        });
    }

    let multipliers = ctx.multipliers();
    let (tp_scale, sl_scale) = match conditions {
        Some(c) => {
            let (tp, sl) = c.regime.level_multipliers();
            (multipliers.take_profit * tp, multipliers.stop_loss * sl)
        }
        None => (multipliers.take_profit, multipliers.stop_loss),
    };
    let base_lot = task.params.lot_size.saturating_mul(multipliers.lot);
    let lot = match conditions {
        Some(c) => c.adaptive_lot(base_lot),
        None => base_lot,
    };
    let lot = normalize_lot(lot, &meta);
    let entry = tick.entry_price(direction);

    let tp_ctx = LevelContext::new(LevelKind::TakeProfit, direction, &meta, entry, lot)
        .with_scale(tp_scale);
    let sl_ctx = LevelContext::new(LevelKind::StopLoss, direction, &meta, entry, lot)
        .with_scale(sl_scale);

    let levels = match ctx.resolver.resolve(&task.params.take_profit, &tp_ctx).await {
        Ok(tp) => ctx
            .resolver
            .resolve(&task.params.stop_loss, &sl_ctx)
            .await
            .map(|sl| (tp, sl)),
        Err(e) => Err(e),
    };

    let (tp, sl) = match levels {
        Ok(levels) => levels,
        Err(err @ SchedulerError::InvalidRiskParameter(_)) => {
            warn!(symbol, strategy = %task.strategy, error = %err, "Risk leg rejected");
            return Ok(TaskOutcome::Completed {
                quality,
                intent: None,
                risk_error: Some(err),
                held: None,
            });
        }
        Err(err) => return Err(err),
    };

    let intent = OrderIntent {
        symbol: task.symbol.clone(),
        direction,
        lot_size: lot,
        entry_price: entry,
        take_profit: tp.price,
        stop_loss: sl.price,
        strategy: task.strategy,
        quality_score: quality.score,
        tags: evaluation.signals.tags(direction),
        created_at: Utc::now(),
    };

    Ok(TaskOutcome::Completed {
        quality,
        intent: Some(intent),
        risk_error: None,
        held: None,
    })
}
