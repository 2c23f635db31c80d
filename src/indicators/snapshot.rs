//! The per-symbol indicator snapshot and the event flags derived from it.

use serde::Serialize;
use std::collections::BTreeMap;

/// Number of trailing values kept for each series
pub const HISTORY_LEN: usize = 3;

/// Short trailing history of one indicator, oldest first.
///
/// A slot is `None` where the indicator had not yet filled its lookback.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series(Vec<Option<f64>>);

impl Series {
    /// Keep the last [`HISTORY_LEN`] entries of a full aligned series
    pub fn tail(values: &[Option<f64>]) -> Self {
        let start = values.len().saturating_sub(HISTORY_LEN);
        Series(values[start..].to_vec())
    }

    pub fn tail_dense(values: &[f64]) -> Self {
        let start = values.len().saturating_sub(HISTORY_LEN);
        Series(values[start..].iter().copied().map(Some).collect())
    }

    pub fn last(&self) -> Option<f64> {
        self.0.last().copied().flatten()
    }

    pub fn prev(&self) -> Option<f64> {
        let len = self.0.len();
        if len < 2 {
            return None;
        }
        self.0[len - 2]
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.last().is_none()
    }
}

/// Result of a one-bar crossover check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    Above,
    Below,
}

/// Everything the signal generators and scorer may read for one symbol.
///
/// Built once per task by [`compute`](super::compute) and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub bar_count: usize,
    /// History was shorter than the longest lookback
    pub insufficient_data: bool,
    /// At least one bar had no volume and it was derived from the range
    pub synthetic_volume: bool,

    pub open: Series,
    pub high: Series,
    pub low: Series,
    pub close: Series,

    /// EMA by period
    pub ema: BTreeMap<usize, Series>,
    pub rsi: Series,
    pub rsi_fast: Series,
    pub rsi_smoothed: Series,

    pub macd: Series,
    pub macd_signal: Series,
    pub macd_histogram: Series,

    pub bb_upper: Series,
    pub bb_middle: Series,
    pub bb_lower: Series,
    pub bb_width: Series,

    pub atr: Series,
    pub atr_ratio: Option<f64>,

    pub stoch_k: Series,
    pub stoch_d: Series,

    pub wma_high: Series,
    pub wma_low: Series,

    pub volume_ratio: Option<f64>,
    pub volume_surge: bool,

    /// Lowest low / highest high over the last 20 bars, current bar included
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    /// Extremes of the 20 bars before the current one
    pub prior_high: Option<f64>,
    pub prior_low: Option<f64>,

    /// 20-bar rolling mean and sample deviation of closes
    pub close_mean: Option<f64>,
    pub close_std: Option<f64>,
    /// Mean absolute close-to-close change over the last 10 bars
    pub avg_abs_change: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn ema(&self, period: usize) -> Option<f64> {
        self.ema.get(&period).and_then(Series::last)
    }

    pub fn ema_prev(&self, period: usize) -> Option<f64> {
        self.ema.get(&period).and_then(Series::prev)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.close.last()
    }

    pub fn prev_close(&self) -> Option<f64> {
        self.close.prev()
    }

    /// Did EMA(fast) cross EMA(slow) on the latest bar?
    pub fn ema_cross(&self, fast: usize, slow: usize) -> Option<Cross> {
        let (f, s) = (self.ema(fast)?, self.ema(slow)?);
        let (fp, sp) = (self.ema_prev(fast)?, self.ema_prev(slow)?);
        if f > s && fp <= sp {
            Some(Cross::Above)
        } else if f < s && fp >= sp {
            Some(Cross::Below)
        } else {
            None
        }
    }

    /// Did `series` cross `level` on the latest bar?
    pub fn level_cross(series: &Series, level: f64) -> Option<Cross> {
        let (now, prev) = (series.last()?, series.prev()?);
        if now > level && prev <= level {
            Some(Cross::Above)
        } else if now < level && prev >= level {
            Some(Cross::Below)
        } else {
            None
        }
    }

    /// Latest close relative to the previous one: +1 up, -1 down, 0 flat
    pub fn bar_direction(&self) -> i8 {
        match (self.last_close(), self.prev_close()) {
            (Some(now), Some(prev)) if now > prev => 1,
            (Some(now), Some(prev)) if now < prev => -1,
            _ => 0,
        }
    }

    /// RSI climbed back out of the oversold zone (below 30) on this bar
    pub fn rsi_oversold_recovery(&self) -> bool {
        matches!((self.rsi.prev(), self.rsi.last()), (Some(p), Some(n)) if p < 30.0 && n >= 30.0)
    }

    /// RSI dropped back out of the overbought zone (above 70) on this bar
    pub fn rsi_overbought_decline(&self) -> bool {
        matches!((self.rsi.prev(), self.rsi.last()), (Some(p), Some(n)) if p > 70.0 && n <= 70.0)
    }

    /// Candle body covers at least 70% of its range: +1 bullish, -1 bearish
    pub fn strong_candle(&self) -> i8 {
        let (open, high, low, close) = match (
            self.open.last(),
            self.high.last(),
            self.low.last(),
            self.close.last(),
        ) {
            (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
            _ => return 0,
        };
        let range = high - low;
        if range <= 0.0 || (close - open).abs() < range * 0.7 {
            return 0;
        }
        if close > open {
            1
        } else {
            -1
        }
    }

    /// Close beyond the previous 20-bar extremes: +1 up, -1 down
    pub fn breakout(&self) -> i8 {
        match (self.last_close(), self.prior_high, self.prior_low) {
            (Some(c), Some(h), _) if c > h => 1,
            (Some(c), _, Some(l)) if c < l => -1,
            _ => 0,
        }
    }

    /// Position of `price` inside the Bollinger band, 0 at lower and 1 at upper
    pub fn bb_position(&self, price: f64) -> Option<f64> {
        let (upper, lower) = (self.bb_upper.last()?, self.bb_lower.last()?);
        if upper == lower {
            return None;
        }
        Some((price - lower) / (upper - lower))
    }

    /// Standard-score of `price` against the 20-bar close distribution
    pub fn z_score(&self, price: f64) -> Option<f64> {
        let (mean, std) = (self.close_mean?, self.close_std?);
        if std > 0.0 {
            Some((price - mean) / std)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Series {
        Series::tail_dense(values)
    }

    #[test]
    fn test_series_tail_keeps_history_len() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(s.values().len(), HISTORY_LEN);
        assert_eq!(s.last(), Some(5.0));
        assert_eq!(s.prev(), Some(4.0));
    }

    #[test]
    fn test_ema_cross_detection() {
        let mut snap = IndicatorSnapshot::default();
        snap.ema.insert(5, series(&[1.0, 0.9, 1.2]));
        snap.ema.insert(8, series(&[1.0, 1.0, 1.0]));
        assert_eq!(snap.ema_cross(5, 8), Some(Cross::Above));
        assert_eq!(snap.ema_cross(8, 5), Some(Cross::Below));
        assert_eq!(snap.ema_cross(5, 13), None);
    }

    #[test]
    fn test_rsi_recovery_flags() {
        let mut snap = IndicatorSnapshot::default();
        snap.rsi = series(&[25.0, 28.0, 31.0]);
        assert!(snap.rsi_oversold_recovery());
        assert!(!snap.rsi_overbought_decline());
    }

    #[test]
    fn test_strong_candle() {
        let mut snap = IndicatorSnapshot::default();
        snap.open = series(&[1.00]);
        snap.high = series(&[1.11]);
        snap.low = series(&[0.99]);
        snap.close = series(&[1.10]);
        assert_eq!(snap.strong_candle(), 1);

        snap.close = series(&[1.02]);
        assert_eq!(snap.strong_candle(), 0);
    }

    #[test]
    fn test_bb_position_and_z_score() {
        let mut snap = IndicatorSnapshot::default();
        snap.bb_upper = series(&[1.2]);
        snap.bb_lower = series(&[1.0]);
        assert_eq!(snap.bb_position(1.1).map(|p| (p * 100.0).round()), Some(50.0));

        snap.close_mean = Some(1.0);
        snap.close_std = Some(0.01);
        assert!((snap.z_score(0.97).unwrap() + 3.0).abs() < 1e-9);
    }
}
