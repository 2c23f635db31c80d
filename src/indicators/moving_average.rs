//! Moving averages and rolling window statistics.
//!
//! Every function returns a series aligned with its input. Positions that do
//! not yet have a full lookback window are `None`.

/// Exponential moving average with multiplier `2 / (period + 1)`.
///
/// The recursion is seeded with the first value and runs over the whole
/// input, so later values do not depend on where the window starts being
/// reported. Values before index `period - 1` are withheld.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.is_empty() {
        return vec![None; values.len()];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = values[0];

    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            current = (value - current) * multiplier + current;
        }
        out.push(if i + 1 >= period { Some(current) } else { None });
    }
    out
}

/// EMA over a series that itself has leading gaps (e.g. the MACD line).
pub fn ema_sparse(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let start = match values.iter().position(Option::is_some) {
        Some(idx) => idx,
        None => return vec![None; values.len()],
    };
    let dense: Vec<f64> = values[start..].iter().map(|v| v.unwrap_or(0.0)).collect();
    let mut out = vec![None; start];
    out.extend(ema(&dense, period));
    out
}

/// Simple moving average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        window.iter().sum::<f64>() / window.len() as f64
    })
}

/// Linearly weighted moving average; the newest value weighs `period`.
pub fn wma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let denominator = (period * (period + 1)) as f64 / 2.0;
    rolling(values, period, |window| {
        window
            .iter()
            .enumerate()
            .map(|(i, v)| v * (i + 1) as f64)
            .sum::<f64>()
            / denominator
    })
}

/// Rolling sample standard deviation (n - 1 denominator)
pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, sample_std)
}

pub fn rolling_min(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        window.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

pub fn rolling_max(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        window.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Mean of a slice; `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sample_std(window: &[f64]) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let avg = window.iter().sum::<f64>() / window.len() as f64;
    let variance = window.iter().map(|v| (v - avg).powi(2)).sum::<f64>()
        / (window.len() - 1) as f64;
    variance.sqrt()
}

fn rolling<F>(values: &[f64], period: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if period == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 >= period {
                Some(f(&values[i + 1 - period..=i]))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_alignment() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(out, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn test_ema_constant_series() {
        let out = ema(&[5.0; 10], 3);
        assert!(out[1].is_none());
        assert!((out[9].unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_ema_tracks_uptrend() {
        let values: Vec<f64> = (1..=30).map(|v| v as f64).collect();
        let fast = ema(&values, 5)[29].unwrap();
        let slow = ema(&values, 20)[29].unwrap();
        assert!(fast > slow);
        assert!(fast < 30.0);
    }

    #[test]
    fn test_wma_weights_recent_values() {
        // (1*1 + 2*2 + 3*3) / 6
        let out = wma(&[1.0, 2.0, 3.0], 3);
        assert!((out[2].unwrap() - 14.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_std_sample() {
        let out = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        // sample variance = 32 / 7
        assert!((out[7].unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_extremes() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(rolling_min(&values, 3)[4], Some(1.0));
        assert_eq!(rolling_max(&values, 3)[4], Some(5.0));
    }

    #[test]
    fn test_ema_sparse_skips_leading_gaps() {
        let out = ema_sparse(&[None, None, Some(1.0), Some(1.0), Some(1.0)], 2);
        assert_eq!(out[0], None);
        assert_eq!(out[2], None);
        assert_eq!(out[4], Some(1.0));
    }
}
