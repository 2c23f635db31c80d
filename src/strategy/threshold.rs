//! Quality-adjusted minimum signal counts.
//!
//! Market-structure confidence moves each strategy's base threshold: strong
//! structure relaxes it, weak structure tightens it. The curve is a value so
//! it can be tuned from configuration.

use serde::{Deserialize, Serialize};

use crate::strategy::types::StrategyKind;

/// Step curve mapping structure confidence to a threshold adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Confidence at or above which the threshold is relaxed
    #[serde(default = "default_high_confidence")]
    pub high_confidence: u32,
    /// Confidence at or above which the base threshold applies unchanged
    #[serde(default = "default_neutral_confidence")]
    pub neutral_confidence: u32,
    /// Signals removed from the requirement under high confidence
    #[serde(default = "default_step")]
    pub relief: u32,
    /// Signals added to the requirement under low confidence
    #[serde(default = "default_step")]
    pub penalty: u32,
    /// The threshold never drops below this
    #[serde(default = "default_floor")]
    pub floor: u32,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            high_confidence: default_high_confidence(),
            neutral_confidence: default_neutral_confidence(),
            relief: default_step(),
            penalty: default_step(),
            floor: default_floor(),
        }
    }
}

fn default_high_confidence() -> u32 {
    80
}

fn default_neutral_confidence() -> u32 {
    60
}

fn default_step() -> u32 {
    1
}

fn default_floor() -> u32 {
    1
}

impl ThresholdPolicy {
    /// Minimum agreeing-signal count for `kind` at structure `confidence`
    pub fn threshold(&self, kind: StrategyKind, confidence: u32) -> u32 {
        let base = kind.base_threshold();
        let adjusted = if confidence >= self.high_confidence {
            base.saturating_sub(self.relief)
        } else if confidence >= self.neutral_confidence {
            base
        } else {
            base.saturating_add(self.penalty)
        };
        adjusted.max(self.floor.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_curve() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.threshold(StrategyKind::Scalping, 80), 2);
        assert_eq!(policy.threshold(StrategyKind::Scalping, 65), 3);
        assert_eq!(policy.threshold(StrategyKind::Scalping, 10), 4);
        assert_eq!(policy.threshold(StrategyKind::Intraday, 100), 3);
    }

    #[test]
    fn test_never_below_one() {
        let policy = ThresholdPolicy {
            relief: 5,
            floor: 0,
            ..Default::default()
        };
        for kind in StrategyKind::ALL {
            assert_eq!(policy.threshold(kind, 100), 1);
        }
    }

    #[test]
    fn test_extreme_penalty_saturates() {
        let policy = ThresholdPolicy {
            penalty: u32::MAX,
            ..Default::default()
        };
        assert_eq!(policy.threshold(StrategyKind::Intraday, 0), u32::MAX);
    }

    #[test]
    fn test_monotone_in_confidence() {
        let policy = ThresholdPolicy::default();
        for kind in StrategyKind::ALL {
            let mut last = u32::MAX;
            for confidence in 0..=100 {
                let t = policy.threshold(kind, confidence);
                assert!(t <= last);
                last = t;
            }
        }
    }
}
