use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::types::Direction;

/// Heaviest rule weight any generator emits; maps to strength 1.0
pub const MAX_SIGNAL_WEIGHT: u8 = 6;

/// The four strategy families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Ultra-short horizon, minute-scale holds
    Hft,
    /// Short horizon
    Scalping,
    /// Medium horizon trend following
    Intraday,
    /// Mean reversion
    Arbitrage,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Hft,
        StrategyKind::Scalping,
        StrategyKind::Intraday,
        StrategyKind::Arbitrage,
    ];

    /// Minimum agreeing-signal count before quality adjustment
    pub fn base_threshold(self) -> u32 {
        match self {
            StrategyKind::Hft => 2,
            StrategyKind::Scalping => 3,
            StrategyKind::Intraday => 4,
            StrategyKind::Arbitrage => 2,
        }
    }

    /// How often this strategy wants to be evaluated
    pub fn loop_interval(self) -> Duration {
        match self {
            StrategyKind::Hft => Duration::from_millis(500),
            StrategyKind::Scalping => Duration::from_millis(1000),
            StrategyKind::Intraday | StrategyKind::Arbitrage => Duration::from_millis(2000),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Hft => "hft",
            StrategyKind::Scalping => "scalping",
            StrategyKind::Intraday => "intraday",
            StrategyKind::Arbitrage => "arbitrage",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One directional signal with its rationale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub direction: Direction,
    /// Rule weight in points
    pub weight: u8,
    /// Weight normalized to 0..=1
    pub strength: f64,
    pub tag: &'static str,
}

impl Signal {
    pub fn new(direction: Direction, weight: u8, tag: &'static str) -> Self {
        Self {
            direction,
            weight,
            strength: (weight as f64 / MAX_SIGNAL_WEIGHT as f64).clamp(0.0, 1.0),
            tag,
        }
    }

    pub fn buy(weight: u8, tag: &'static str) -> Self {
        Self::new(Direction::Buy, weight, tag)
    }

    pub fn sell(weight: u8, tag: &'static str) -> Self {
        Self::new(Direction::Sell, weight, tag)
    }

    /// Buy when `sign > 0`, sell when `sign < 0`, nothing when flat
    pub fn from_sign(sign: i8, weight: u8, tag: &'static str) -> Option<Self> {
        match sign {
            s if s > 0 => Some(Self::buy(weight, tag)),
            s if s < 0 => Some(Self::sell(weight, tag)),
            _ => None,
        }
    }
}

/// Ordered signals for one (symbol, strategy) pair at one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSet {
    signals: Vec<Signal>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    pub fn push_opt(&mut self, signal: Option<Signal>) {
        if let Some(signal) = signal {
            self.signals.push(signal);
        }
    }

    pub fn extend(&mut self, other: SignalSet) {
        self.signals.extend(other.signals);
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn count(&self, direction: Direction) -> u32 {
        self.signals
            .iter()
            .filter(|s| s.direction == direction)
            .count() as u32
    }

    pub fn weight(&self, direction: Direction) -> u32 {
        self.signals
            .iter()
            .filter(|s| s.direction == direction)
            .map(|s| s.weight as u32)
            .sum()
    }

    /// Side with strictly more agreeing signals; a tie is `None`
    pub fn dominant(&self) -> Option<(Direction, u32)> {
        let (buys, sells) = (self.count(Direction::Buy), self.count(Direction::Sell));
        if buys > sells {
            Some((Direction::Buy, buys))
        } else if sells > buys {
            Some((Direction::Sell, sells))
        } else {
            None
        }
    }

    /// Tags of the signals pointing in `direction`
    pub fn tags(&self, direction: Direction) -> Vec<String> {
        self.signals
            .iter()
            .filter(|s| s.direction == direction)
            .map(|s| s.tag.to_string())
            .collect()
    }
}

impl FromIterator<Signal> for SignalSet {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        Self {
            signals: iter.into_iter().collect(),
        }
    }
}
