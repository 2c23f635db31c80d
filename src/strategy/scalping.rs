//! Short-horizon rules: EMA5/EMA13 crossovers confirmed by RSI, RSI recovery
//! from extremes, Bollinger squeeze breakouts, strong candles and volume bursts.

use crate::indicators::{Cross, IndicatorSnapshot};
use crate::strategy::traits::SignalGenerator;
use crate::strategy::types::{Signal, SignalSet, StrategyKind};

/// Band width under which the bands count as squeezed
const SQUEEZE_WIDTH: f64 = 0.01;

pub struct ShortHorizonGenerator;

impl SignalGenerator for ShortHorizonGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scalping
    }

    fn generate(&self, snapshot: &IndicatorSnapshot, current_price: f64) -> SignalSet {
        let mut set = SignalSet::new();
        let rsi = snapshot.rsi.last();
        let rsi_neutral = rsi.map(|r| (30.0..=70.0).contains(&r)).unwrap_or(false);

        match (snapshot.ema_cross(5, 13), rsi_neutral) {
            (Some(Cross::Above), true) => set.push(Signal::buy(5, "ema5_ema13_cross_up_rsi_ok")),
            (Some(Cross::Above), false) => set.push(Signal::buy(3, "ema5_ema13_cross_up")),
            (Some(Cross::Below), true) => {
                set.push(Signal::sell(5, "ema5_ema13_cross_down_rsi_ok"))
            }
            (Some(Cross::Below), false) => set.push(Signal::sell(3, "ema5_ema13_cross_down")),
            (None, _) => {}
        }

        if snapshot.rsi_oversold_recovery() {
            set.push(Signal::buy(4, "rsi_oversold_recovery"));
        } else if snapshot.rsi_overbought_decline() {
            set.push(Signal::sell(4, "rsi_overbought_decline"));
        }

        if let (Some(width), Some(upper), Some(lower), Some(prev)) = (
            snapshot.bb_width.last(),
            snapshot.bb_upper.last(),
            snapshot.bb_lower.last(),
            snapshot.prev_close(),
        ) {
            if width < SQUEEZE_WIDTH {
                if current_price > upper && current_price > prev {
                    set.push(Signal::buy(4, "bb_squeeze_breakout_up"));
                } else if current_price < lower && current_price < prev {
                    set.push(Signal::sell(4, "bb_squeeze_breakout_down"));
                }
            }
        }

        set.push_opt(Signal::from_sign(
            snapshot.strong_candle(),
            3,
            "strong_candle",
        ));

        if snapshot.volume_surge {
            if let Some(prev) = snapshot.prev_close() {
                if current_price > prev {
                    set.push(Signal::buy(2, "volume_surge_up"));
                } else {
                    set.push(Signal::sell(2, "volume_surge_down"));
                }
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

    fn bullish_snapshot() -> IndicatorSnapshot {
        let mut snap = IndicatorSnapshot::default();
        snap.ema.insert(5, s(&[1.1000, 1.1004]));
        snap.ema.insert(13, s(&[1.1002, 1.1003]));
        snap.rsi = s(&[28.0, 34.0]);
        snap.bb_width = s(&[0.004, 0.005]);
        snap.bb_upper = s(&[1.1010, 1.1012]);
        snap.bb_lower = s(&[1.0990, 1.0991]);
        snap.open = s(&[1.1000, 1.1001]);
        snap.high = s(&[1.1005, 1.1016]);
        snap.low = s(&[1.0998, 1.1000]);
        snap.close = s(&[1.1002, 1.1015]);
        snap.volume_surge = true;
        snap
    }

    #[test]
    fn test_five_agreeing_signals() {
        let set = ShortHorizonGenerator.generate(&bullish_snapshot(), 1.1015);
        assert_eq!(set.count(Direction::Buy), 5);
        assert_eq!(set.count(Direction::Sell), 0);
        assert_eq!(set.signals()[0].weight, 5);
    }

    #[test]
    fn test_cross_with_extreme_rsi_weighs_less() {
        let mut snap = bullish_snapshot();
        snap.rsi = s(&[74.0, 78.0]);
        let set = ShortHorizonGenerator.generate(&snap, 1.1015);
        assert_eq!(set.signals()[0].tag, "ema5_ema13_cross_up");
        assert_eq!(set.signals()[0].weight, 3);
    }

    #[test]
    fn test_wide_bands_do_not_breakout() {
        let mut snap = IndicatorSnapshot::default();
        snap.bb_width = s(&[0.03]);
        snap.bb_upper = s(&[1.1010]);
        snap.bb_lower = s(&[1.0990]);
        snap.close = s(&[1.1000, 1.1005]);
        assert!(ShortHorizonGenerator.generate(&snap, 1.1020).is_empty());
    }
}
