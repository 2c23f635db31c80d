//! Ultra-short-horizon rules: fast EMA micro-crossovers, RSI(7) shifts,
//! outsized single-bar moves and MACD histogram acceleration.

use crate::indicators::{Cross, IndicatorSnapshot};
use crate::strategy::traits::SignalGenerator;
use crate::strategy::types::{Signal, SignalSet, StrategyKind};

/// Bar move that counts as strong, relative to the recent mean move
const MOMENTUM_MULTIPLE: f64 = 2.0;

pub struct UltraShortGenerator;

impl SignalGenerator for UltraShortGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hft
    }

    fn generate(&self, snapshot: &IndicatorSnapshot, current_price: f64) -> SignalSet {
        let mut set = SignalSet::new();

        match snapshot.ema_cross(5, 8) {
            Some(Cross::Above) => set.push(Signal::buy(4, "ema5_ema8_cross_up")),
            Some(Cross::Below) => set.push(Signal::sell(4, "ema5_ema8_cross_down")),
            None => {}
        }

        match IndicatorSnapshot::level_cross(&snapshot.rsi_fast, 50.0) {
            Some(Cross::Above) => set.push(Signal::buy(3, "rsi7_above_50")),
            Some(Cross::Below) => set.push(Signal::sell(3, "rsi7_below_50")),
            None => {}
        }

        if let (Some(prev), Some(avg)) = (snapshot.prev_close(), snapshot.avg_abs_change) {
            if (current_price - prev).abs() > avg * MOMENTUM_MULTIPLE && avg > 0.0 {
                if current_price > prev {
                    set.push(Signal::buy(3, "strong_up_momentum"));
                } else {
                    set.push(Signal::sell(3, "strong_down_momentum"));
                }
            }
        }

        let hist = &snapshot.macd_histogram;
        if let (Some(now), Some(prev)) = (hist.last(), hist.prev()) {
            if now > 0.0 && now > prev {
                set.push(Signal::buy(2, "macd_accel_up"));
            } else if now < 0.0 && now < prev {
                set.push(Signal::sell(2, "macd_accel_down"));
            }
        }

        set
    }
}
