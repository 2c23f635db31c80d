//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use strategy_scheduler::config::AppConfig;
use strategy_scheduler::paper::{RecordingOrderSink, StaticInstruments};
use strategy_scheduler::strategy::{DedupSettings, ThresholdPolicy};
use strategy_scheduler::{
    Bar, MarketDataSource, Result, Scheduler, SchedulerError, StaticConfigSource, StrategyKind,
    Tick, Timeframe,
};

/// 250 one-minute bars climbing one pip per bar, closing on a 30-pip breakout
pub static UPTREND: Lazy<Vec<Bar>> = Lazy::new(|| {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
    let n = 250;
    (0..n)
        .map(|i| {
            let open = 1.0800 + i as f64 * 0.0001;
            let close = if i + 1 == n { open + 0.0030 } else { open + 0.0001 };
            Bar::new(
                start + ChronoDuration::minutes(i as i64),
                open,
                close + 0.00002,
                open - 0.00002,
                close,
            )
        })
        .collect()
});

/// Quote matching the last [`UPTREND`] close, two-pip spread
pub fn uptrend_tick() -> Tick {
    let last = UPTREND[UPTREND.len() - 1].close;
    let bid = Decimal::try_from(last).unwrap().round_dp(4);
    Tick::new(bid, bid + dec!(0.0002))
}

/// Scripted market data with per-symbol delays and failures
///
/// Every symbol serves [`UPTREND`]. Fetch concurrency and the order in which
/// bar fetches start are recorded.
#[derive(Default)]
pub struct FakeMarket {
    delays: HashMap<String, Duration>,
    unavailable: HashSet<String>,
    disconnected: HashSet<String>,
    panicking: HashSet<String>,
    active: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<String>>,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn with_unavailable(mut self, symbol: &str) -> Self {
        self.unavailable.insert(symbol.to_string());
        self
    }

    pub fn with_disconnected(mut self, symbol: &str) -> Self {
        self.disconnected.insert(symbol.to_string());
        self
    }

    pub fn with_panic(mut self, symbol: &str) -> Self {
        self.panicking.insert(symbol.to_string());
        self
    }

    /// Most bar fetches ever in progress at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    fn check(&self, symbol: &str) -> Result<()> {
        if self.disconnected.contains(symbol) {
            return Err(SchedulerError::ConnectionLost(format!("{} feed down", symbol)));
        }
        if self.unavailable.contains(symbol) {
            return Err(SchedulerError::DataUnavailable(symbol.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    async fn fetch_bars(&self, symbol: &str, _timeframe: Timeframe, count: usize) -> Result<Vec<Bar>> {
        self.started.lock().unwrap().push(symbol.to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(symbol) {
            tokio::time::sleep(*delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(symbol) {
            panic!("bar feed for {} crashed", symbol);
        }
        self.check(symbol)?;
        let skip = UPTREND.len().saturating_sub(count);
        Ok(UPTREND[skip..].to_vec())
    }

    async fn fetch_tick(&self, symbol: &str) -> Result<Tick> {
        self.check(symbol)?;
        Ok(uptrend_tick())
    }
}

/// Config over `symbols` with one strategy, session scaling, news windows and
/// volatility scaling off, and a threshold any single agreeing signal clears
pub fn test_config(symbols: &[&str], strategy: StrategyKind) -> AppConfig {
    let mut config = AppConfig::default();
    config.symbols = symbols.iter().map(|s| s.to_string()).collect();
    config.active_strategies = vec![strategy];
    config.sessions_enabled = false;
    config.news.enabled = false;
    config.adaptive.enabled = false;
    config.threshold = ThresholdPolicy {
        high_confidence: 0,
        relief: 10,
        ..Default::default()
    };
    config.scheduler.batch_size = symbols.len().max(1);
    config.scheduler.pool_size = symbols.len().max(1);
    config.scheduler.batch_yield_ms = 0;
    config.scheduler.cycle_interval_ms = Some(1000);
    config
}

pub fn no_dedup() -> DedupSettings {
    DedupSettings {
        enabled: false,
        ..Default::default()
    }
}

/// Everything a scheduler test needs to inspect afterwards
pub struct Harness {
    pub scheduler: Scheduler,
    pub market: Arc<FakeMarket>,
    pub sink: Arc<RecordingOrderSink>,
    pub config: Arc<StaticConfigSource>,
}

pub fn harness(market: FakeMarket, config: AppConfig) -> Harness {
    harness_with_dedup(market, config, no_dedup())
}

pub fn harness_with_dedup(market: FakeMarket, config: AppConfig, dedup: DedupSettings) -> Harness {
    let market = Arc::new(market);
    let sink = Arc::new(RecordingOrderSink::new());
    let config = Arc::new(StaticConfigSource::new(config));
    let scheduler = Scheduler::new(
        market.clone(),
        Arc::new(StaticInstruments::new()),
        sink.clone(),
        config.clone(),
    )
    .with_dedup(dedup);
    Harness {
        scheduler,
        market,
        sink,
        config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptrend_fixture() {
        assert_eq!(UPTREND.len(), 250);
        assert!(UPTREND.windows(2).all(|w| w[1].close > w[0].close));
        assert!(uptrend_tick().ask > uptrend_tick().bid);
    }
}
