//! Volume ratio and burst detection, with synthetic volume for bars that
//! carry none.

use crate::common::types::Bar;

/// Scale applied to the high-low range when volume has to be synthesized
pub const SYNTHETIC_VOLUME_SCALE: f64 = 100_000.0;

/// Ratio above which the current bar counts as a volume surge
pub const VOLUME_SURGE_RATIO: f64 = 1.5;

/// Per-bar volume and whether any of it had to be synthesized
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSeries {
    pub values: Vec<f64>,
    pub synthetic: bool,
}

/// Take real volume where present, otherwise derive it from the bar range.
pub fn resolve_volume(bars: &[Bar]) -> VolumeSeries {
    let mut synthetic = false;
    let values = bars
        .iter()
        .map(|bar| match bar.volume {
            Some(v) => v,
            None => {
                synthetic = true;
                bar.range() * SYNTHETIC_VOLUME_SCALE
            }
        })
        .collect();
    VolumeSeries { values, synthetic }
}

/// Last volume over the mean of the last `window` volumes
pub fn volume_ratio(volumes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || volumes.len() < window {
        return None;
    }
    let current = *volumes.last()?;
    let avg = volumes[volumes.len() - window..].iter().sum::<f64>() / window as f64;
    if avg > 0.0 {
        Some(current / avg)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_synthetic_volume_flagged() {
        let bars = vec![
            Bar::new(Utc::now(), 1.0, 1.002, 1.0, 1.001),
            Bar::new(Utc::now(), 1.0, 1.001, 1.0, 1.001).with_volume(50.0),
        ];
        let series = resolve_volume(&bars);
        assert!(series.synthetic);
        assert!((series.values[0] - 200.0).abs() < 1e-6);
        assert_eq!(series.values[1], 50.0);
    }

    #[test]
    fn test_real_volume_not_flagged() {
        let bars = vec![Bar::new(Utc::now(), 1.0, 1.1, 0.9, 1.0).with_volume(10.0)];
        assert!(!resolve_volume(&bars).synthetic);
    }

    #[test]
    fn test_volume_ratio_spike() {
        let mut volumes = vec![100.0; 19];
        volumes.push(300.0);
        let ratio = volume_ratio(&volumes, 20).unwrap();
        // 300 / (2200 / 20)
        assert!((ratio - 300.0 / 110.0).abs() < 1e-9);
        assert!(ratio > VOLUME_SURGE_RATIO);
    }

    #[test]
    fn test_volume_ratio_short_history() {
        assert!(volume_ratio(&[1.0, 2.0], 20).is_none());
    }
}
