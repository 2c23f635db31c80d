//! In-memory collaborators for paper trading and local runs
//!
//! None of these touch a real terminal. Bars come from a deterministic
//! sine-plus-drift walk keyed on the symbol and the wall clock, so two fetches
//! within the same bar agree with each other.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::common::errors::{Result, SchedulerError};
use crate::common::traits::{CurrencyConverter, InstrumentMetadataSource, MarketDataSource, OrderSink};
use crate::common::types::{Bar, InstrumentMeta, OrderIntent, Tick, Timeframe};

/// Reference mid prices for the pairs the paper market knows
const REFERENCE_PRICES: &[(&str, f64)] = &[
    ("EURUSD", 1.0850),
    ("GBPUSD", 1.2700),
    ("USDJPY", 150.00),
    ("AUDUSD", 0.6600),
    ("USDCHF", 0.8800),
    ("USDCAD", 1.3600),
    ("NZDUSD", 0.6100),
    ("EURGBP", 0.8550),
    ("EURJPY", 162.70),
    ("GBPJPY", 190.50),
];

/// Default metadata for a six-letter FX pair; JPY quotes use two digits
pub fn forex_meta(symbol: &str) -> InstrumentMeta {
    let meta = InstrumentMeta::forex(symbol);
    if symbol.to_ascii_uppercase().ends_with("JPY") {
        meta.with_point(dec!(0.01), 2)
    } else {
        meta
    }
}

/// Synthetic market data
pub struct PaperMarket {
    prices: HashMap<String, f64>,
    disconnected: Arc<AtomicBool>,
    delay_ms: AtomicU64,
    amplitude: f64,
    drift: f64,
}

impl Default for PaperMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperMarket {
    /// A market quoting every reference pair
    pub fn new() -> Self {
        Self {
            prices: REFERENCE_PRICES
                .iter()
                .map(|(s, p)| (s.to_string(), *p))
                .collect(),
            disconnected: Arc::new(AtomicBool::new(false)),
            delay_ms: AtomicU64::new(0),
            amplitude: 0.002,
            drift: 0.00002,
        }
    }

    /// Quote an extra symbol around `mid`
    pub fn with_symbol(mut self, symbol: impl Into<String>, mid: f64) -> Self {
        self.prices.insert(symbol.into(), mid);
        self
    }

    /// Relative sine amplitude and per-bar drift
    pub fn with_shape(mut self, amplitude: f64, drift: f64) -> Self {
        self.amplitude = amplitude;
        self.drift = drift;
        self
    }

    /// While set, every fetch fails with `ConnectionLost`
    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Artificial latency added to every fetch
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.prices.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    async fn before_fetch(&self, symbol: &str) -> Result<f64> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.is_disconnected() {
            return Err(SchedulerError::ConnectionLost(
                "paper market disconnected".to_string(),
            ));
        }
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| SchedulerError::DataUnavailable(format!("{}: not quoted", symbol)))
    }

    /// Bars ending at the bar that contains `end`, oldest first
    pub fn history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let mid = self
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| SchedulerError::DataUnavailable(format!("{}: not quoted", symbol)))?;
        Ok(self.bars_at(symbol, mid, timeframe, count, end))
    }

    fn bars_at(
        &self,
        symbol: &str,
        mid: f64,
        timeframe: Timeframe,
        count: usize,
        now: DateTime<Utc>,
    ) -> Vec<Bar> {
        let step = timeframe.seconds();
        let last = now.timestamp().div_euclid(step);
        let phase = symbol.bytes().map(f64::from).sum::<f64>();
        let price = |index: i64| {
            let x = index as f64;
            let wave = (x / 12.0 + phase).sin() * self.amplitude;
            let trend = (x % 500.0) * self.drift;
            mid * (1.0 + wave + trend)
        };

        (0..count as i64)
            .rev()
            .filter_map(|back| {
                let index = last - back;
                let open = price(index - 1);
                let close = price(index);
                let wick = (close - open).abs() * 0.5 + mid * 0.00005;
                let volume = 100.0 + 50.0 * (index as f64 / 7.0).cos().abs();
                let timestamp = Utc.timestamp_opt(index * step, 0).single()?;
                Some(
                    Bar::new(
                        timestamp,
                        open,
                        open.max(close) + wick,
                        open.min(close) - wick,
                        close,
                    )
                    .with_volume(volume),
                )
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataSource for PaperMarket {
    async fn fetch_bars(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Result<Vec<Bar>> {
        let mid = self.before_fetch(symbol).await?;
        Ok(self.bars_at(symbol, mid, timeframe, count, Utc::now()))
    }

    async fn fetch_tick(&self, symbol: &str) -> Result<Tick> {
        let mid = self.before_fetch(symbol).await?;
        let now = Utc::now();
        let close = self
            .bars_at(symbol, mid, Timeframe::M1, 1, now)
            .last()
            .map(|bar| bar.close)
            .unwrap_or(mid);

        let meta = forex_meta(symbol);
        let bid = Decimal::from_f64(close)
            .ok_or_else(|| SchedulerError::DataUnavailable(format!("{}: bad price", symbol)))?
            .round_dp(meta.digits);
        let ask = bid + meta.point * Decimal::from(meta.spread);
        Ok(Tick::new(bid, ask))
    }
}

/// Metadata from a fixed table, with FX defaults for unlisted six-letter pairs
#[derive(Debug, Clone, Default)]
pub struct StaticInstruments {
    table: HashMap<String, InstrumentMeta>,
}

impl StaticInstruments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, meta: InstrumentMeta) -> Self {
        self.table.insert(meta.symbol.clone(), meta);
        self
    }
}

#[async_trait]
impl InstrumentMetadataSource for StaticInstruments {
    async fn instrument(&self, symbol: &str) -> Result<InstrumentMeta> {
        if let Some(meta) = self.table.get(symbol) {
            return Ok(meta.clone());
        }
        if symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_alphabetic()) {
            return Ok(forex_meta(symbol));
        }
        Err(SchedulerError::DataUnavailable(format!(
            "{}: no instrument metadata",
            symbol
        )))
    }
}

/// Exchange rates read off live quotes
///
/// Tries the direct pair bid, then the inverse of the reverse pair's ask, then
/// a cross through USD.
pub struct TickCurrencyConverter {
    market: Arc<dyn MarketDataSource>,
}

impl TickCurrencyConverter {
    pub fn new(market: Arc<dyn MarketDataSource>) -> Self {
        Self { market }
    }

    /// Direct or inverted quote; `None` when neither pair is quoted
    async fn quoted(&self, from: &str, to: &str) -> Result<Option<Decimal>> {
        match self.market.fetch_tick(&format!("{}{}", from, to)).await {
            Ok(tick) if tick.bid > Decimal::ZERO => return Ok(Some(tick.bid)),
            Ok(_) | Err(SchedulerError::DataUnavailable(_)) => {}
            Err(e) => return Err(e),
        }
        match self.market.fetch_tick(&format!("{}{}", to, from)).await {
            Ok(tick) if tick.ask > Decimal::ZERO => Ok(Some(Decimal::ONE / tick.ask)),
            Ok(_) | Err(SchedulerError::DataUnavailable(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CurrencyConverter for TickCurrencyConverter {
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal> {
        let from = from.to_ascii_uppercase();
        let to = to.to_ascii_uppercase();
        if from == to {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.quoted(&from, &to).await? {
            return Ok(rate);
        }
        if from != "USD" && to != "USD" {
            if let (Some(a), Some(b)) = (
                self.quoted(&from, "USD").await?,
                self.quoted("USD", &to).await?,
            ) {
                debug!(from = %from, to = %to, "Rate crossed through USD");
                return Ok(a * b);
            }
        }
        Err(SchedulerError::DataUnavailable(format!(
            "no rate for {}/{}",
            from, to
        )))
    }
}

/// Keeps every accepted intent in memory
#[derive(Default)]
pub struct RecordingOrderSink {
    intents: Mutex<Vec<OrderIntent>>,
    refusing: AtomicBool,
}

impl RecordingOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, submissions fail with `OrderRejected`
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    pub async fn intents(&self) -> Vec<OrderIntent> {
        self.intents.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.intents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.intents.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.intents.lock().await.clear();
    }
}

#[async_trait]
impl OrderSink for RecordingOrderSink {
    async fn submit(&self, intent: &OrderIntent) -> Result<()> {
        if self.refusing.load(Ordering::SeqCst) {
            return Err(SchedulerError::OrderRejected(format!(
                "{} {}",
                intent.symbol, intent.direction
            )));
        }
        self.intents.lock().await.push(intent.clone());
        Ok(())
    }
}
