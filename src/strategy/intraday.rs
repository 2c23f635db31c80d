//! Medium-horizon rules: EMA20/EMA50 alignment against EMA200, MACD
//! confirmation, RSI in the healthy-trend band, breakouts and ATR expansion.

use crate::indicators::{Cross, IndicatorSnapshot};
use crate::strategy::traits::SignalGenerator;
use crate::strategy::types::{Signal, SignalSet, StrategyKind};

/// ATR over its recent average above which volatility is expanding
const ATR_EXPANSION: f64 = 1.2;

pub struct MediumHorizonGenerator;

impl SignalGenerator for MediumHorizonGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Intraday
    }

    fn generate(&self, snapshot: &IndicatorSnapshot, current_price: f64) -> SignalSet {
        let mut set = SignalSet::new();
        let ema20 = snapshot.ema(20);
        let ema50 = snapshot.ema(50);
        let ema200 = snapshot.ema(200);

        match snapshot.ema_cross(20, 50) {
            Some(Cross::Above) => {
                if matches!((ema50, ema200), (Some(m), Some(l)) if m > l) {
                    set.push(Signal::buy(6, "ema20_ema50_cross_up_trend"));
                } else {
                    set.push(Signal::buy(4, "ema20_ema50_cross_up"));
                }
            }
            Some(Cross::Below) => {
                if matches!((ema50, ema200), (Some(m), Some(l)) if m < l) {
                    set.push(Signal::sell(6, "ema20_ema50_cross_down_trend"));
                } else {
                    set.push(Signal::sell(4, "ema20_ema50_cross_down"));
                }
            }
            None => {}
        }

        if let (Some(line), Some(signal), Some(hist)) = (
            snapshot.macd.last(),
            snapshot.macd_signal.last(),
            snapshot.macd_histogram.last(),
        ) {
            if line > signal && hist > 0.0 {
                set.push(Signal::buy(4, "macd_bullish"));
            } else if line < signal && hist < 0.0 {
                set.push(Signal::sell(4, "macd_bearish"));
            }
        }

        if let (Some(rsi), Some(fast), Some(slow)) = (snapshot.rsi.last(), ema20, ema50) {
            if (40.0..=60.0).contains(&rsi) {
                if fast > slow {
                    set.push(Signal::buy(3, "healthy_uptrend"));
                } else if fast < slow {
                    set.push(Signal::sell(3, "healthy_downtrend"));
                }
            }
        }

        set.push_opt(Signal::from_sign(snapshot.breakout(), 5, "breakout"));

        if let (Some(ratio), Some(prev)) = (snapshot.atr_ratio, snapshot.prev_close()) {
            if ratio > ATR_EXPANSION {
                if current_price > prev {
                    set.push(Signal::buy(2, "volatility_expansion_up"));
                } else {
                    set.push(Signal::sell(2, "volatility_expansion_down"));
                }
            }
        }

        set
    }
}
