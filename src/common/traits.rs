//! Trait definitions for the external collaborators
//!
//! The core never talks to a trading terminal directly. Everything it needs
//! from the outside world arrives through these traits, so the scheduler can
//! run against a live bridge, the in-memory `paper` implementations, or test
//! doubles without change.

use async_trait::async_trait;
use rust_decimal::Decimal;

#[cfg(test)]
use mockall::automock;

use super::errors::Result;
use super::types::{Bar, InstrumentMeta, OrderIntent, Tick, Timeframe};
use crate::config::ConfigSnapshot;

/// Source of bars and quotes
///
/// Implementations may block or fail. The scheduler always calls them inside
/// the task deadline, so a hung call surfaces as `TimedOut` rather than a stall.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the most recent `count` bars, oldest first
    async fn fetch_bars(&self, symbol: &str, timeframe: Timeframe, count: usize)
        -> Result<Vec<Bar>>;

    /// Fetch the current bid/ask
    async fn fetch_tick(&self, symbol: &str) -> Result<Tick>;
}

/// Source of per-symbol trading metadata
///
/// Metadata changes slowly. Callers that want caching wrap their source in
/// [`CachedMetadataSource`](super::cache::CachedMetadataSource).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InstrumentMetadataSource: Send + Sync {
    async fn instrument(&self, symbol: &str) -> Result<InstrumentMeta>;
}

/// Exchange-rate lookup for currency-denominated TP/SL values
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Units of `to` per one unit of `from`
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal>;
}

/// Receives finished order intents
///
/// The core does not retry. A sink that wants retries implements them itself.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn submit(&self, intent: &OrderIntent) -> Result<()>;
}

/// Provides the immutable per-cycle configuration view
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn snapshot(&self) -> Result<ConfigSnapshot>;
}
