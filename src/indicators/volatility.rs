//! Volatility measures: Bollinger bands and ATR.

use super::moving_average::{rolling_std, sma};
use crate::common::types::Bar;

/// Bollinger bands aligned with the input closes
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    /// `(upper - lower) / middle`
    pub width: Vec<Option<f64>>,
}

/// Bollinger bands: SMA(period) plus/minus `multiplier` sample deviations
pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> BollingerSeries {
    let middle = sma(closes, period);
    let deviation = rolling_std(closes, period);

    let mut upper = Vec::with_capacity(closes.len());
    let mut lower = Vec::with_capacity(closes.len());
    let mut width = Vec::with_capacity(closes.len());

    for (mid, dev) in middle.iter().zip(&deviation) {
        match (mid, dev) {
            (Some(mid), Some(dev)) => {
                let up = mid + dev * multiplier;
                let low = mid - dev * multiplier;
                upper.push(Some(up));
                lower.push(Some(low));
                width.push(if *mid != 0.0 {
                    Some((up - low) / mid)
                } else {
                    None
                });
            }
            _ => {
                upper.push(None);
                lower.push(None);
                width.push(None);
            }
        }
    }

    BollingerSeries {
        upper,
        middle,
        lower,
        width,
    }
}

/// True range per bar; the first bar uses its own high-low range.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let range = bar.high - bar.low;
            if i == 0 {
                return range;
            }
            let prev_close = bars[i - 1].close;
            range
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        })
        .collect()
}

/// Average true range as a rolling mean of the true range
pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    sma(&true_range(bars), period)
}

/// Current ATR over the mean of the last `window` ATR values
pub fn atr_ratio(atr_values: &[Option<f64>], window: usize) -> Option<f64> {
    let current = (*atr_values.last()?)?;
    let recent: Vec<f64> = atr_values
        .iter()
        .rev()
        .take(window)
        .flatten()
        .copied()
        .collect();
    if recent.len() < window {
        return None;
    }
    let avg = recent.iter().sum::<f64>() / recent.len() as f64;
    if avg > 0.0 {
        Some(current / avg)
    } else {
        None
    }
}
