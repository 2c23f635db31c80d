//! Strategy families and their signal generators
//!
//! Every family turns the same [`IndicatorSnapshot`](crate::indicators::IndicatorSnapshot)
//! into a [`SignalSet`]; the scheduler never branches on the family itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PER TASK (pure)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IndicatorSnapshot + current price                          │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  StrategyKind.generator().generate() → SignalSet            │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  ThresholdPolicy (structure confidence) → min count         │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PER CYCLE (shared)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TradingSession   → lot / TP / SL multipliers               │
//! │  SignalDeduplicator → suppress repeats before emission      │
//! │  NewsSettings     → hold intents inside news windows        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`SignalGenerator`]: Trait implemented by each family
//! - [`StrategyKind`]: HFT, Scalping, Intraday, Arbitrage
//! - [`Signal`] / [`SignalSet`]: Directional signals with rationale tags
//! - [`ThresholdPolicy`]: Confidence-adjusted minimum signal counts
//! - [`SignalDeduplicator`]: Cross-cycle repeat suppression
//! - [`NewsSettings`]: UTC news blackout windows

mod types;
mod traits;
mod hft;
mod scalping;
mod intraday;
mod mean_reversion;
mod threshold;
mod sessions;
mod dedup;
mod news;

pub use types::{Signal, SignalSet, StrategyKind, MAX_SIGNAL_WEIGHT};

pub use traits::{GeneratorRef, SignalGenerator};

pub use hft::UltraShortGenerator;
pub use intraday::MediumHorizonGenerator;
pub use mean_reversion::MeanReversionGenerator;
pub use scalping::ShortHorizonGenerator;

pub use threshold::ThresholdPolicy;

pub use sessions::{session_at, SessionMultipliers, TradingSession};

pub use dedup::{DedupSettings, DedupVerdict, SignalDeduplicator, SignalKey};

pub use news::{NewsSettings, NewsWindow};
