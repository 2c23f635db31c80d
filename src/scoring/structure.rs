//! Market-structure analysis
//!
//! Classifies the snapshot as bullish, bearish or neutral with a 0-100
//! confidence. The confidence feeds both the quality score and the dynamic
//! signal threshold, so it is computed before any generator runs.

use serde::Serialize;

use crate::common::types::Direction;
use crate::indicators::IndicatorSnapshot;

/// Relative bar move counted as momentum
const MOMENTUM_MOVE: f64 = 0.001;
/// Relative distance to a level counted as "near"
const NEAR_LEVEL: f64 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Bias::Bullish => Some(Direction::Buy),
            Bias::Bearish => Some(Direction::Sell),
            Bias::Neutral => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Volatility {
    High,
    Normal,
}

/// Result of [`analyze`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStructure {
    pub bias: Bias,
    pub confidence: u32,
    pub trend_strength: u32,
    pub momentum: Option<Direction>,
    pub volatility: Volatility,
    /// Relative distance from price to the 20-bar low
    pub support_distance: Option<f64>,
    /// Relative distance from price to the 20-bar high
    pub resistance_distance: Option<f64>,
    pub near_support: bool,
    pub near_resistance: bool,
}

impl Default for MarketStructure {
    fn default() -> Self {
        Self {
            bias: Bias::Neutral,
            confidence: 0,
            trend_strength: 0,
            momentum: None,
            volatility: Volatility::Normal,
            support_distance: None,
            resistance_distance: None,
            near_support: false,
            near_resistance: false,
        }
    }
}

impl MarketStructure {
    /// Within `fraction` of either support or resistance
    pub fn within_level(&self, fraction: f64) -> bool {
        [self.support_distance, self.resistance_distance]
            .into_iter()
            .flatten()
            .any(|d| d < fraction)
    }
}

/// Analyze one snapshot at `current_price`
pub fn analyze(snapshot: &IndicatorSnapshot, current_price: f64) -> MarketStructure {
    let mut ms = MarketStructure::default();
    let mut confidence: i64 = 0;

    if let (Some(e5), Some(e13), Some(e50)) = (snapshot.ema(5), snapshot.ema(13), snapshot.ema(50))
    {
        let e200 = snapshot.ema(200);
        if e5 > e13 && e13 > e50 {
            ms.bias = Bias::Bullish;
            if matches!(e200, Some(l) if e50 > l) {
                confidence += 25;
                ms.trend_strength = 30;
            } else {
                confidence += 15;
                ms.trend_strength = 20;
            }
        } else if e5 < e13 && e13 < e50 {
            ms.bias = Bias::Bearish;
            if matches!(e200, Some(l) if e50 < l) {
                confidence += 25;
                ms.trend_strength = 30;
            } else {
                confidence += 15;
                ms.trend_strength = 20;
            }
        }
    }

    if let Some(prev) = snapshot.prev_close().filter(|p| *p > 0.0) {
        let change = (current_price - prev) / prev;
        if change.abs() > MOMENTUM_MOVE {
            confidence += 20;
            ms.momentum = Some(if change > 0.0 {
                Direction::Buy
            } else {
                Direction::Sell
            });
        }
    }

    if let Some(rsi) = snapshot.rsi.last() {
        if (40.0..=60.0).contains(&rsi) {
            confidence += 15;
        } else if (30.0..=70.0).contains(&rsi) {
            confidence += 10;
        } else if !(25.0..=75.0).contains(&rsi) {
            confidence += 8;
        }
    }

    if let (Some(hist), Some(prev)) = (snapshot.macd_histogram.last(), snapshot.macd_histogram.prev())
    {
        if hist.abs() > prev.abs() && hist != 0.0 {
            confidence += 15;
            if ms.momentum.is_none() {
                ms.momentum = Some(if hist > 0.0 {
                    Direction::Buy
                } else {
                    Direction::Sell
                });
            }
        }
    }

    if let Some(position) = snapshot.bb_position(current_price) {
        if !(0.2..=0.8).contains(&position) {
            confidence += 10;
            ms.volatility = Volatility::High;
        } else if (0.4..=0.6).contains(&position) {
            confidence += 15;
        }
    }

    if !snapshot.synthetic_volume {
        match snapshot.volume_ratio {
            Some(r) if r > 1.5 => confidence += 10,
            Some(r) if r > 1.2 => confidence += 5,
            _ => {}
        }
    }

    if current_price > 0.0 {
        ms.support_distance = snapshot
            .support
            .map(|s| (current_price - s).abs() / current_price);
        ms.resistance_distance = snapshot
            .resistance
            .map(|r| (r - current_price).abs() / current_price);
        ms.near_support = matches!(ms.support_distance, Some(d) if d < NEAR_LEVEL);
        ms.near_resistance = matches!(ms.resistance_distance, Some(d) if d < NEAR_LEVEL);
    }

    if ms.bias.direction().is_some() && ms.bias.direction() == ms.momentum {
        confidence += 10;
    }

    ms.confidence = confidence.clamp(0, 100) as u32;
    ms
}
