//! Momentum oscillators: RSI (rolling and Wilder-smoothed), MACD, Stochastic.

use super::moving_average::{ema, ema_sparse, rolling_max, rolling_min};

/// MACD line, signal line and histogram, aligned with the input closes
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// RSI using a rolling mean of gains and losses over `period` changes.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let (gains, losses) = changes(closes);
    for i in period..closes.len() {
        // change j describes closes[j] -> closes[j + 1]
        let window = i - period..i;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

/// RSI with Wilder smoothing, the smoothed variant of [`rsi`].
pub fn rsi_wilder(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let (gains, losses) = changes(closes);
    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        out[i + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

/// MACD(fast, slow, signal)
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let signal_line = ema_sparse(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| match (l, s) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        })
        .collect();

    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Stochastic %K(k_period) and %D(d_period) on 0..=100.
///
/// A flat window (highest high equals lowest low) reads as 50.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let highest = rolling_max(highs, k_period);
    let lowest = rolling_min(lows, k_period);

    let k: Vec<Option<f64>> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| match (highest[i], lowest[i]) {
            (Some(hh), Some(ll)) if hh > ll => Some(100.0 * (close - ll) / (hh - ll)),
            (Some(_), Some(_)) => Some(50.0),
            _ => None,
        })
        .collect();

    let d = (0..k.len())
        .map(|i| {
            if d_period == 0 || i + 1 < d_period {
                return None;
            }
            let window = &k[i + 1 - d_period..=i];
            if window.iter().all(Option::is_some) {
                Some(window.iter().flatten().sum::<f64>() / d_period as f64)
            } else {
                None
            }
        })
        .collect();

    (k, d)
}

fn changes(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uptrend(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    fn downtrend(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 - i as f64).collect()
    }

    #[test]
    fn test_rsi_extremes() {
        assert_eq!(rsi(&uptrend(30), 14)[29], Some(100.0));
        assert_eq!(rsi(&downtrend(30), 14)[29], Some(0.0));
        assert_eq!(rsi(&[1.0; 30], 14)[29], Some(50.0));
    }

    #[test]
    fn test_rsi_needs_period_changes() {
        let out = rsi(&uptrend(15), 14);
        assert!(out[13].is_none());
        assert!(out[14].is_some());
    }

    #[test]
    fn test_wilder_rsi_bounded() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0)
            .collect();
        for value in rsi_wilder(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let series = macd(&uptrend(60), 12, 26, 9);
        assert!(series.line[59].unwrap() > 0.0);
        assert!(series.signal[59].is_some());
        assert!(series.line[20].is_none());
    }

    #[test]
    fn test_stochastic_at_top_of_range() {
        let closes = uptrend(20);
        let highs: Vec<f64> = closes.iter().map(|c| c + 0.5).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 0.5).collect();
        let (k, d) = stochastic(&highs, &lows, &closes, 14, 3);
        let k_last = k[19].unwrap();
        assert!(k_last > 90.0 && k_last <= 100.0);
        assert!(d[19].is_some());
        assert!(d[14].is_none());
    }
}
