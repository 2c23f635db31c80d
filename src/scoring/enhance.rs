//! Signals derived from market structure rather than from a strategy's rule
//! table. They are appended to the generator's set before scoring.

use crate::common::types::Direction;
use crate::indicators::IndicatorSnapshot;
use crate::scoring::structure::{Bias, MarketStructure};
use crate::strategy::{Signal, SignalSet};

/// Bar move, in pips, needed for a momentum signal
const MOMENTUM_PIPS: f64 = 5.0;

pub fn enhancement_signals(
    structure: &MarketStructure,
    snapshot: &IndicatorSnapshot,
    current_price: f64,
    pip_size: f64,
) -> SignalSet {
    let mut set = SignalSet::new();
    let rsi = snapshot.rsi.last();
    let ema_fast_above = match (snapshot.ema(5), snapshot.ema(13)) {
        (Some(f), Some(s)) => Some(f > s),
        _ => None,
    };

    if structure.confidence > 50 {
        match structure.bias {
            Bias::Bullish => {
                if matches!(rsi, Some(r) if r < 40.0) {
                    set.push(Signal::buy(3, "structure_bullish_pullback"));
                } else if ema_fast_above == Some(true) {
                    set.push(Signal::buy(2, "structure_bullish_trend"));
                }
            }
            Bias::Bearish => {
                if matches!(rsi, Some(r) if r > 60.0) {
                    set.push(Signal::sell(3, "structure_bearish_rally"));
                } else if ema_fast_above == Some(false) {
                    set.push(Signal::sell(2, "structure_bearish_trend"));
                }
            }
            Bias::Neutral => {}
        }
    }

    let prev = snapshot.prev_close();
    if let (Some(momentum), Some(prev)) = (structure.momentum, prev) {
        let moved_pips = if pip_size > 0.0 {
            (current_price - prev).abs() / pip_size
        } else {
            0.0
        };
        if structure.confidence > 30 && moved_pips > MOMENTUM_PIPS {
            set.push(Signal::new(momentum, 2, "structure_momentum"));
        }
    }

    let rising = matches!(prev, Some(p) if current_price > p);
    let falling = matches!(prev, Some(p) if current_price < p);
    if structure.near_support
        && structure.momentum != Some(Direction::Sell)
        && matches!(rsi, Some(r) if r < 40.0)
        && rising
    {
        set.push(Signal::buy(3, "structure_support_bounce"));
    } else if structure.near_resistance
        && structure.momentum != Some(Direction::Buy)
        && matches!(rsi, Some(r) if r > 60.0)
        && falling
    {
        set.push(Signal::sell(3, "structure_resistance_rejection"));
    }

    if structure.confidence >= 70 {
        if let Some(direction) = structure.bias.direction() {
            set.push(Signal::new(direction, 2, "structure_high_confidence"));
        }
    }

    set
}
