//! Configuration types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::common::errors::{Result, SchedulerError};
use crate::common::types::Timeframe;
use crate::risk::{is_supported_currency, AdaptiveSettings, RiskParameter, SpreadLimits};
use crate::strategy::{DedupSettings, NewsSettings, StrategyKind, ThresholdPolicy};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Currency the account balance is held in
    #[serde(default = "default_account_currency")]
    pub account_currency: String,
    /// Symbols evaluated each cycle, in batch order
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Strategy families evaluated for every symbol
    #[serde(default = "default_active_strategies")]
    pub active_strategies: Vec<StrategyKind>,
    /// Per-strategy lot and TP/SL
    #[serde(default)]
    pub strategies: StrategyTable,
    /// Worker pool, batching and deadlines
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Scale lot/TP/SL by the current trading session
    #[serde(default = "default_true")]
    pub sessions_enabled: bool,
    /// Minimum quality score for a direction to be emitted
    #[serde(default)]
    pub min_quality_score: u32,
    /// Confidence curve for the dynamic signal threshold
    #[serde(default)]
    pub threshold: ThresholdPolicy,
    /// Repeat-signal suppression
    #[serde(default)]
    pub dedup: DedupSettings,
    /// News blackout windows
    #[serde(default)]
    pub news: NewsSettings,
    /// Widest spread each asset class may trade at
    #[serde(default)]
    pub spread: SpreadLimits,
    /// Volatility-regime lot and TP/SL scaling
    #[serde(default)]
    pub adaptive: AdaptiveSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            account_currency: default_account_currency(),
            symbols: default_symbols(),
            active_strategies: default_active_strategies(),
            strategies: StrategyTable::default(),
            scheduler: SchedulerSettings::default(),
            sessions_enabled: true,
            min_quality_score: 0,
            threshold: ThresholdPolicy::default(),
            dedup: DedupSettings::default(),
            news: NewsSettings::default(),
            spread: SpreadLimits::default(),
            adaptive: AdaptiveSettings::default(),
        }
    }
}

fn default_account_currency() -> String {
    "USD".to_string()
}

fn default_symbols() -> Vec<String> {
    ["EURUSD", "GBPUSD", "USDJPY", "AUDUSD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_active_strategies() -> Vec<StrategyKind> {
    StrategyKind::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if !is_supported_currency(&self.account_currency) {
            return Err(SchedulerError::Configuration(format!(
                "unsupported account currency '{}'",
                self.account_currency
            )));
        }
        if self.min_quality_score > 100 {
            return Err(SchedulerError::Configuration(format!(
                "min_quality_score {} exceeds 100",
                self.min_quality_score
            )));
        }
        self.scheduler.validate()?;
        if self.news.hft_lookahead_minutes < 0 || self.news.major_lookahead_minutes < 0 {
            return Err(SchedulerError::Configuration(
                "news lookahead minutes must not be negative".to_string(),
            ));
        }
        let workload = self.symbols.len() * self.active_strategies.len();
        if !self.scheduler.bounds_workload(workload) {
            warn!(
                pool_size = self.scheduler.pool_size,
                workload,
                "Worker pool is not smaller than symbols x strategies, batching has no effect"
            );
        }
        for kind in StrategyKind::ALL {
            self.strategies
                .get(kind)
                .validate()
                .map_err(|e| SchedulerError::Configuration(format!("{}: {}", kind, e)))?;
        }
        Ok(())
    }

    /// Immutable per-cycle view. Disabled strategies are dropped from the
    /// active set here.
    pub fn snapshot(&self) -> ConfigSnapshot {
        let mut active: Vec<StrategyKind> = Vec::new();
        for kind in &self.active_strategies {
            if self.strategies.get(*kind).enabled && !active.contains(kind) {
                active.push(*kind);
            }
        }
        ConfigSnapshot {
            taken_at: Utc::now(),
            account_currency: self.account_currency.to_uppercase(),
            symbols: self.symbols.clone(),
            active_strategies: active,
            strategies: self.strategies.clone(),
            scheduler: self.scheduler.clone(),
            sessions_enabled: self.sessions_enabled,
            min_quality_score: self.min_quality_score,
            threshold: self.threshold,
            news: self.news.clone(),
            spread: self.spread.clone(),
            adaptive: self.adaptive.clone(),
        }
    }
}

/// Worker pool and cycle timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Maximum tasks running at once
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Symbols per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Per-task deadline, counted from dispatch
    #[serde(default = "default_task_deadline_ms")]
    pub task_deadline_ms: u64,
    /// Pause between batches
    #[serde(default = "default_batch_yield_ms")]
    pub batch_yield_ms: u64,
    /// Bars fetched per symbol
    #[serde(default = "default_bar_count")]
    pub bar_count: usize,
    #[serde(default)]
    pub timeframe: Timeframe,
    /// Fixed cycle interval; the fastest active strategy's loop interval when unset
    #[serde(default)]
    pub cycle_interval_ms: Option<u64>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            batch_size: default_batch_size(),
            task_deadline_ms: default_task_deadline_ms(),
            batch_yield_ms: default_batch_yield_ms(),
            bar_count: default_bar_count(),
            timeframe: Timeframe::default(),
            cycle_interval_ms: None,
        }
    }
}

fn default_pool_size() -> usize {
    2
}

fn default_batch_size() -> usize {
    2
}

fn default_task_deadline_ms() -> u64 {
    5000
}

fn default_batch_yield_ms() -> u64 {
    50
}

fn default_bar_count() -> usize {
    250
}

impl SchedulerSettings {
    pub fn task_deadline(&self) -> Duration {
        Duration::from_millis(self.task_deadline_ms)
    }

    pub fn batch_yield(&self) -> Duration {
        Duration::from_millis(self.batch_yield_ms)
    }

    /// Configured interval, or the fastest loop interval among `active`
    pub fn cycle_interval(&self, active: &[StrategyKind]) -> Duration {
        match self.cycle_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None => active
                .iter()
                .map(|k| k.loop_interval())
                .min()
                .unwrap_or_else(|| StrategyKind::Scalping.loop_interval()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(SchedulerError::Configuration(
                "scheduler.pool_size must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SchedulerError::Configuration(
                "scheduler.batch_size must be at least 1".to_string(),
            ));
        }
        if self.bar_count < 2 {
            return Err(SchedulerError::Configuration(
                "scheduler.bar_count must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the pool is smaller than a cycle of `tasks` tasks
    pub fn bounds_workload(&self, tasks: usize) -> bool {
        tasks == 0 || self.pool_size < tasks
    }
}

/// Lot and protective levels for one strategy family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub lot_size: Decimal,
    pub take_profit: RiskParameter,
    pub stop_loss: RiskParameter,
}

impl StrategySettings {
    pub fn new(lot_size: Decimal, take_profit: RiskParameter, stop_loss: RiskParameter) -> Self {
        Self {
            enabled: true,
            lot_size,
            take_profit,
            stop_loss,
        }
    }

    fn pips(lot_size: Decimal, tp: &str, sl: &str) -> Self {
        Self::new(lot_size, RiskParameter::pips(tp), RiskParameter::pips(sl))
    }

    pub fn validate(&self) -> Result<()> {
        if self.lot_size <= Decimal::ZERO {
            return Err(SchedulerError::Configuration(format!(
                "lot_size {} must be positive",
                self.lot_size
            )));
        }
        self.take_profit.value()?;
        self.stop_loss.value()?;
        Ok(())
    }
}

/// One [`StrategySettings`] per family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTable {
    #[serde(default = "default_hft")]
    pub hft: StrategySettings,
    #[serde(default = "default_scalping")]
    pub scalping: StrategySettings,
    #[serde(default = "default_intraday")]
    pub intraday: StrategySettings,
    #[serde(default = "default_arbitrage")]
    pub arbitrage: StrategySettings,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self {
            hft: default_hft(),
            scalping: default_scalping(),
            intraday: default_intraday(),
            arbitrage: default_arbitrage(),
        }
    }
}

fn default_hft() -> StrategySettings {
    StrategySettings::pips(dec!(0.01), "3", "2")
}

fn default_scalping() -> StrategySettings {
    StrategySettings::pips(dec!(0.05), "8", "5")
}

fn default_intraday() -> StrategySettings {
    StrategySettings::pips(dec!(0.1), "25", "15")
}

fn default_arbitrage() -> StrategySettings {
    StrategySettings::pips(dec!(0.01), "1", "0.5")
}

impl StrategyTable {
    pub fn get(&self, kind: StrategyKind) -> &StrategySettings {
        match kind {
            StrategyKind::Hft => &self.hft,
            StrategyKind::Scalping => &self.scalping,
            StrategyKind::Intraday => &self.intraday,
            StrategyKind::Arbitrage => &self.arbitrage,
        }
    }

    pub fn get_mut(&mut self, kind: StrategyKind) -> &mut StrategySettings {
        match kind {
            StrategyKind::Hft => &mut self.hft,
            StrategyKind::Scalping => &mut self.scalping,
            StrategyKind::Intraday => &mut self.intraday,
            StrategyKind::Arbitrage => &mut self.arbitrage,
        }
    }
}

/// Read-only configuration taken once per cycle
///
/// Tasks receive their [`StrategySettings`] by value from this snapshot, so a
/// configuration change never reaches a task already dispatched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    pub taken_at: DateTime<Utc>,
    pub account_currency: String,
    pub symbols: Vec<String>,
    /// Active and enabled strategies, deduplicated, in configured order
    pub active_strategies: Vec<StrategyKind>,
    pub strategies: StrategyTable,
    pub scheduler: SchedulerSettings,
    pub sessions_enabled: bool,
    pub min_quality_score: u32,
    pub threshold: ThresholdPolicy,
    pub news: NewsSettings,
    pub spread: SpreadLimits,
    pub adaptive: AdaptiveSettings,
}

impl ConfigSnapshot {
    pub fn strategy(&self, kind: StrategyKind) -> StrategySettings {
        self.strategies.get(kind).clone()
    }

    /// (symbol, strategy) pairs grouped into batches of `batch_size` symbols
    pub fn batches(&self) -> Vec<Vec<(String, StrategyKind)>> {
        let size = self.scheduler.batch_size.max(1);
        self.symbols
            .chunks(size)
            .map(|chunk| {
                chunk
                    .iter()
                    .flat_map(|symbol| {
                        self.active_strategies
                            .iter()
                            .map(move |kind| (symbol.clone(), *kind))
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_negative_news_lookahead_rejected() {
        let mut config = AppConfig::default();
        config.news.major_lookahead_minutes = -5;
        assert!(matches!(
            config.validate(),
            Err(SchedulerError::Configuration(_))
        ));
    }

    #[test]
    fn test_pool_must_undercut_workload() {
        let mut settings = SchedulerSettings::default();
        settings.pool_size = 4;
        assert!(settings.bounds_workload(10));
        assert!(!settings.bounds_workload(4));
        assert!(!settings.bounds_workload(2));
        assert!(settings.bounds_workload(0));
    }

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.pool_size, 2);
        assert_eq!(config.strategies.intraday.take_profit, RiskParameter::pips("25"));
        assert_eq!(config.strategies.arbitrage.stop_loss.value().unwrap(), dec!(0.5));
    }

    #[test]
    fn test_zero_pool_rejected() {
        let mut config = AppConfig::default();
        config.scheduler.pool_size = 0;
        assert!(matches!(
            config.validate(),
            Err(SchedulerError::Configuration(_))
        ));
    }

    #[test]
    fn test_bad_level_rejected() {
        let mut config = AppConfig::default();
        config.strategies.hft.stop_loss = RiskParameter::pips("-2");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_snapshot_drops_disabled_and_duplicates() {
        let mut config = AppConfig::default();
        config.active_strategies = vec![
            StrategyKind::Scalping,
            StrategyKind::Hft,
            StrategyKind::Scalping,
        ];
        config.strategies.hft.enabled = false;
        let snap = config.snapshot();
        assert_eq!(snap.active_strategies, vec![StrategyKind::Scalping]);
    }

    #[test]
    fn test_batches() {
        let mut config = AppConfig::default();
        config.symbols = vec!["A".into(), "B".into(), "C".into()];
        config.active_strategies = vec![StrategyKind::Hft, StrategyKind::Intraday];
        let batches = config.snapshot().batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 4);
        assert_eq!(batches[1], vec![
            ("C".to_string(), StrategyKind::Hft),
            ("C".to_string(), StrategyKind::Intraday),
        ]);
    }

    #[test]
    fn test_cycle_interval_follows_fastest_strategy() {
        let settings = SchedulerSettings::default();
        assert_eq!(
            settings.cycle_interval(&[StrategyKind::Intraday, StrategyKind::Hft]),
            Duration::from_millis(500)
        );
        let fixed = SchedulerSettings {
            cycle_interval_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(fixed.cycle_interval(&[]), Duration::from_millis(250));
    }
}
