//! Mean-reversion rules: extreme Bollinger positioning, displacement from the
//! band middle, RSI reversal through 50, support/resistance rejection and
//! z-score displacement.

use crate::indicators::{Cross, IndicatorSnapshot};
use crate::strategy::traits::SignalGenerator;
use crate::strategy::types::{Signal, SignalSet, StrategyKind};

/// Outer fraction of the band that counts as extreme
const BAND_EDGE: f64 = 0.05;
/// Relative distance from the band middle that counts as displaced
const MEAN_DISPLACEMENT: f64 = 0.015;
/// Relative distance from support/resistance that counts as touching
const LEVEL_PROXIMITY: f64 = 0.002;
const Z_SCORE_LIMIT: f64 = 2.0;

pub struct MeanReversionGenerator;

impl SignalGenerator for MeanReversionGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Arbitrage
    }

    fn generate(&self, snapshot: &IndicatorSnapshot, current_price: f64) -> SignalSet {
        let mut set = SignalSet::new();
        let rsi = snapshot.rsi.last();
        let prev = snapshot.prev_close();
        let rising = matches!(prev, Some(p) if current_price > p);
        let falling = matches!(prev, Some(p) if current_price < p);

        if let (Some(position), Some(rsi)) = (snapshot.bb_position(current_price), rsi) {
            if position <= BAND_EDGE {
                if rsi < 25.0 && rising {
                    set.push(Signal::buy(6, "band_extreme_oversold_reversal"));
                } else if rsi < 35.0 {
                    set.push(Signal::buy(4, "band_oversold_bounce"));
                }
            } else if position >= 1.0 - BAND_EDGE {
                if rsi > 75.0 && falling {
                    set.push(Signal::sell(6, "band_extreme_overbought_reversal"));
                } else if rsi > 65.0 {
                    set.push(Signal::sell(4, "band_overbought_decline"));
                }
            }
        }

        if let Some(middle) = snapshot.bb_middle.last().filter(|m| *m > 0.0) {
            if (current_price - middle).abs() / middle > MEAN_DISPLACEMENT {
                if current_price < middle && rising {
                    set.push(Signal::buy(3, "below_mean_recovery"));
                } else if current_price > middle && falling {
                    set.push(Signal::sell(3, "above_mean_decline"));
                }
            }
        }

        if let (Some(ema20), Some(hist)) = (snapshot.ema(20), snapshot.macd_histogram.last()) {
            match IndicatorSnapshot::level_cross(&snapshot.rsi, 50.0) {
                Some(Cross::Above) if current_price > ema20 && hist > 0.0 => {
                    set.push(Signal::buy(3, "rsi50_cross_up_momentum"))
                }
                Some(Cross::Below) if current_price < ema20 && hist < 0.0 => {
                    set.push(Signal::sell(3, "rsi50_cross_down_momentum"))
                }
                _ => {}
            }
        }

        if let (Some(support), Some(resistance), Some(rsi)) =
            (snapshot.support, snapshot.resistance, rsi)
        {
            if current_price > 0.0 {
                let to_support = (current_price - support).abs() / current_price;
                let to_resistance = (current_price - resistance).abs() / current_price;
                if to_support < LEVEL_PROXIMITY {
                    if rising && rsi < 40.0 {
                        set.push(Signal::buy(4, "support_bounce"));
                    }
                } else if to_resistance < LEVEL_PROXIMITY && falling && rsi > 60.0 {
                    set.push(Signal::sell(4, "resistance_rejection"));
                }
            }
        }

        if let Some(z) = snapshot.z_score(current_price) {
            if z < -Z_SCORE_LIMIT {
                set.push(Signal::buy(3, "statistical_oversold"));
            } else if z > Z_SCORE_LIMIT {
                set.push(Signal::sell(3, "statistical_overbought"));
            }
        }

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Direction;
    use crate::indicators::Series;

    fn s(values: &[f64]) -> Series {
        Series::tail_dense(values)
    }

    #[test]
    fn test_oversold_reversal_cluster() {
        let mut snap = IndicatorSnapshot::default();
        snap.bb_upper = s(&[1.1200]);
        snap.bb_middle = s(&[1.1100]);
        snap.bb_lower = s(&[1.0900]);
        snap.rsi = s(&[20.0, 22.0]);
        snap.close = s(&[1.0880, 1.0890]);
        snap.support = Some(1.0890);
        snap.resistance = Some(1.1250);
        snap.close_mean = Some(1.1100);
        snap.close_std = Some(0.0080);

        let set = MeanReversionGenerator.generate(&snap, 1.0895);
        // band reversal, below-mean recovery, support bounce, z-score
        assert_eq!(set.count(Direction::Buy), 4);
        assert_eq!(set.signals()[0].weight, 6);
        assert_eq!(set.count(Direction::Sell), 0);
    }

    #[test]
    fn test_mid_band_is_quiet() {
        let mut snap = IndicatorSnapshot::default();
        snap.bb_upper = s(&[1.1020]);
        snap.bb_middle = s(&[1.1000]);
        snap.bb_lower = s(&[1.0980]);
        snap.rsi = s(&[50.0, 50.0]);
        snap.close = s(&[1.1000, 1.1001]);
        assert!(MeanReversionGenerator.generate(&snap, 1.1001).is_empty());
    }
}
