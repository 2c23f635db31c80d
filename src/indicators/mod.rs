//! Indicator Engine
//!
//! Pure functions turning an ordered bar series into an [`IndicatorSnapshot`].
//! No state is kept between calls and no symbol ever sees another symbol's
//! data.
//!
//! ```text
//! bars ──► closes/highs/lows/volume ──► series functions ──► tail(HISTORY_LEN) ──► snapshot
//! ```
//!
//! When fewer than [`MIN_LOOKBACK`] bars arrive the snapshot is still built,
//! flagged `insufficient_data`, and every indicator whose own lookback is not
//! met is left empty. Generators treat empty inputs as "no signal".

pub mod moving_average;
pub mod oscillators;
pub mod snapshot;
pub mod volatility;
pub mod volume;

pub use snapshot::{Cross, IndicatorSnapshot, Series, HISTORY_LEN};

use crate::common::types::Bar;

/// Longest lookback any indicator needs (EMA 200)
pub const MIN_LOOKBACK: usize = 200;

/// EMA periods carried in every snapshot
pub const EMA_PERIODS: [usize; 8] = [5, 8, 12, 13, 20, 26, 50, 200];

pub const RSI_PERIOD: usize = 14;
pub const RSI_FAST_PERIOD: usize = 7;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_MULTIPLIER: f64 = 2.0;
pub const ATR_PERIOD: usize = 14;
pub const STOCH_K: usize = 14;
pub const STOCH_D: usize = 3;
pub const WMA_PERIOD: usize = 20;
/// Window for volume average, ATR average, support/resistance and z-score
pub const STRUCTURE_WINDOW: usize = 20;
pub const CHANGE_WINDOW: usize = 10;

/// Compute the full snapshot for one symbol.
pub fn compute(bars: &[Bar]) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot {
        bar_count: bars.len(),
        insufficient_data: bars.len() < MIN_LOOKBACK,
        ..Default::default()
    };
    if bars.len() < 2 {
        return snap;
    }

    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    snap.open = Series::tail_dense(&opens);
    snap.high = Series::tail_dense(&highs);
    snap.low = Series::tail_dense(&lows);
    snap.close = Series::tail_dense(&closes);

    for period in EMA_PERIODS {
        snap.ema
            .insert(period, Series::tail(&moving_average::ema(&closes, period)));
    }

    snap.rsi = Series::tail(&oscillators::rsi(&closes, RSI_PERIOD));
    snap.rsi_fast = Series::tail(&oscillators::rsi(&closes, RSI_FAST_PERIOD));
    snap.rsi_smoothed = Series::tail(&oscillators::rsi_wilder(&closes, RSI_PERIOD));

    let macd = oscillators::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    snap.macd = Series::tail(&macd.line);
    snap.macd_signal = Series::tail(&macd.signal);
    snap.macd_histogram = Series::tail(&macd.histogram);

    let bands = volatility::bollinger(&closes, BB_PERIOD, BB_MULTIPLIER);
    snap.bb_upper = Series::tail(&bands.upper);
    snap.bb_middle = Series::tail(&bands.middle);
    snap.bb_lower = Series::tail(&bands.lower);
    snap.bb_width = Series::tail(&bands.width);

    let atr = volatility::atr(bars, ATR_PERIOD);
    snap.atr = Series::tail(&atr);
    snap.atr_ratio = volatility::atr_ratio(&atr, STRUCTURE_WINDOW);

    let (k, d) = oscillators::stochastic(&highs, &lows, &closes, STOCH_K, STOCH_D);
    snap.stoch_k = Series::tail(&k);
    snap.stoch_d = Series::tail(&d);

    snap.wma_high = Series::tail(&moving_average::wma(&highs, WMA_PERIOD));
    snap.wma_low = Series::tail(&moving_average::wma(&lows, WMA_PERIOD));

    let volumes = volume::resolve_volume(bars);
    snap.synthetic_volume = volumes.synthetic;
    snap.volume_ratio = volume::volume_ratio(&volumes.values, STRUCTURE_WINDOW);
    snap.volume_surge = snap
        .volume_ratio
        .map(|r| r > volume::VOLUME_SURGE_RATIO)
        .unwrap_or(false);

    let n = bars.len();
    if n >= STRUCTURE_WINDOW {
        let window = n - STRUCTURE_WINDOW..n;
        snap.support = moving_average::rolling_min(&lows[window.clone()], STRUCTURE_WINDOW)
            .last()
            .copied()
            .flatten();
        snap.resistance = moving_average::rolling_max(&highs[window.clone()], STRUCTURE_WINDOW)
            .last()
            .copied()
            .flatten();
        snap.close_mean = moving_average::mean(&closes[window.clone()]);
        snap.close_std = moving_average::rolling_std(&closes[window], STRUCTURE_WINDOW)
            .last()
            .copied()
            .flatten();
    }
    if n > STRUCTURE_WINDOW {
        let prior = n - 1 - STRUCTURE_WINDOW..n - 1;
        snap.prior_high = highs[prior.clone()].iter().copied().reduce(f64::max);
        snap.prior_low = lows[prior].iter().copied().reduce(f64::min);
    }
    if n > CHANGE_WINDOW {
        let changes: Vec<f64> = closes[n - 1 - CHANGE_WINDOW..]
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .collect();
        snap.avg_abs_change = moving_average::mean(&changes);
    }

    snap
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn trending_bars(n: usize, step: f64) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 1.1000 + step * i as f64 + (i as f64 * 0.5).sin() * 0.0002;
                let open = close - step;
                Bar::new(
                    start + Duration::minutes(i as i64),
                    open,
                    open.max(close) + 0.0003,
                    open.min(close) - 0.0003,
                    close,
                )
            })
            .collect()
    }

    #[test]
    fn test_full_snapshot_populated() {
        let snap = compute(&trending_bars(250, 0.0001));
        assert!(!snap.insufficient_data);
        assert!(snap.synthetic_volume);
        for period in EMA_PERIODS {
            assert!(snap.ema(period).is_some(), "ema{} missing", period);
        }
        assert!(snap.rsi.last().is_some());
        assert!(snap.rsi_smoothed.last().is_some());
        assert!(snap.macd_histogram.last().is_some());
        assert!(snap.atr_ratio.is_some());
        assert!(snap.stoch_d.last().is_some());
        assert!(snap.wma_high.last().unwrap() > snap.wma_low.last().unwrap());
        assert!(snap.support.unwrap() < snap.resistance.unwrap());
    }

    #[test]
    fn test_uptrend_orders_emas() {
        let snap = compute(&trending_bars(250, 0.0002));
        assert!(snap.ema(5).unwrap() > snap.ema(50).unwrap());
        assert!(snap.ema(50).unwrap() > snap.ema(200).unwrap());
    }

    #[test]
    fn test_short_history_is_partial() {
        let snap = compute(&trending_bars(60, 0.0001));
        assert!(snap.insufficient_data);
        assert!(snap.ema(200).is_none());
        assert!(snap.ema(50).is_some());
        assert!(snap.rsi.last().is_some());
    }

    #[test]
    fn test_degenerate_history() {
        let snap = compute(&trending_bars(1, 0.0001));
        assert!(snap.insufficient_data);
        assert!(snap.close.is_empty());
        assert!(compute(&[]).ema.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let bars = trending_bars(220, 0.0001);
        assert_eq!(compute(&bars), compute(&bars));
    }
}
