//! Strategy Scheduler Library
//!
//! Runs a fixed set of trading strategies over a set of symbols in
//! deadline-bounded cycles, scores each candidate direction, and turns the
//! survivors into fully resolved order intents with TP/SL prices.
//!
//! The outside world (market data, instrument metadata, exchange rates,
//! order routing, configuration) is reached only through the traits in
//! [`common::traits`]; [`paper`] provides in-memory implementations.

pub mod common;
pub mod config;
pub mod indicators;
pub mod paper;
pub mod risk;
pub mod scheduler;
pub mod scoring;
pub mod strategy;

// Re-export commonly used types
pub use common::errors::{Result, SchedulerError};
pub use common::traits::{
    ConfigSource, CurrencyConverter, InstrumentMetadataSource, MarketDataSource, OrderSink,
};
pub use common::types::{Bar, Direction, InstrumentMeta, LevelKind, OrderIntent, Tick, Timeframe};
pub use config::types::AppConfig;
pub use config::{load_config, ConfigSnapshot, StaticConfigSource};
pub use indicators::IndicatorSnapshot;

// Pipeline types
pub use risk::{RiskParameter, RiskResolver, RiskUnit};
pub use scheduler::{
    CycleReport, RunSummary, Scheduler, SchedulerHandle, SchedulerState, TaskOutcome, TaskState,
};
pub use scoring::{QualityScore, QualityScorer};
pub use strategy::{Signal, SignalSet, StrategyKind, TradingSession};
