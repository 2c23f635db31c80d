//! Quality Scorer
//!
//! Six weighted components summing to at most 100:
//!
//! | component            | max |
//! |----------------------|-----|
//! | `market_structure`   | 25  |
//! | `trend_strength`     | 20  |
//! | `confluence`         | 20  |
//! | `oscillator`         | 15  |
//! | `price_action`       | 10  |
//! | `support_resistance` | 10  |
//!
//! Evaluation order is fixed: structure, then generator, then enhancement
//! signals, then the score itself.

use serde::Serialize;

use crate::common::types::Direction;
use crate::indicators::IndicatorSnapshot;
use crate::scoring::enhance::enhancement_signals;
use crate::scoring::structure::{analyze, MarketStructure, Volatility};
use crate::strategy::{SignalSet, StrategyKind, ThresholdPolicy};

/// Relative distance to a level that still earns partial credit
const LEVEL_CONTEXT: f64 = 0.01;

/// One named sub-score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreComponent {
    pub name: &'static str,
    pub points: u32,
    pub max: u32,
}

/// Final confidence and direction for one (symbol, strategy) evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    pub score: u32,
    pub direction: Option<Direction>,
    pub breakdown: Vec<ScoreComponent>,
    /// Dynamic minimum agreeing-signal count that applied
    pub threshold: u32,
    /// Agreeing signals on the dominant side
    pub agreeing: u32,
}

impl QualityScore {
    /// Sum of the breakdown; always equal to `score`
    pub fn total(&self) -> u32 {
        self.breakdown.iter().map(|c| c.points).sum()
    }

    pub fn component(&self, name: &str) -> Option<u32> {
        self.breakdown
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.points)
    }
}

/// Everything a task learns from one evaluation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub structure: MarketStructure,
    pub signals: SignalSet,
    pub quality: QualityScore,
}

#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    policy: ThresholdPolicy,
    min_quality_score: u32,
}

impl QualityScorer {
    pub fn new(policy: ThresholdPolicy, min_quality_score: u32) -> Self {
        Self {
            policy,
            min_quality_score,
        }
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    /// Structure, generator, enhancement, score; in that order
    pub fn evaluate(
        &self,
        kind: StrategyKind,
        snapshot: &IndicatorSnapshot,
        current_price: f64,
        pip_size: f64,
    ) -> Evaluation {
        let structure = analyze(snapshot, current_price);
        let mut signals = kind.generate(snapshot, current_price);
        signals.extend(enhancement_signals(
            &structure,
            snapshot,
            current_price,
            pip_size,
        ));
        let quality = self.score(kind, &signals, &structure, snapshot);
        Evaluation {
            structure,
            signals,
            quality,
        }
    }

    /// Score an already assembled signal set
    pub fn score(
        &self,
        kind: StrategyKind,
        signals: &SignalSet,
        structure: &MarketStructure,
        snapshot: &IndicatorSnapshot,
    ) -> QualityScore {
        let threshold = self.policy.threshold(kind, structure.confidence);
        let dominant = signals.dominant();
        let agreeing = dominant.map(|(_, n)| n).unwrap_or_else(|| {
            signals
                .count(Direction::Buy)
                .max(signals.count(Direction::Sell))
        });

        let breakdown = vec![
            ScoreComponent {
                name: "market_structure",
                points: structure_points(structure.confidence),
                max: 25,
            },
            ScoreComponent {
                name: "trend_strength",
                points: trend_points(structure.trend_strength),
                max: 20,
            },
            ScoreComponent {
                name: "confluence",
                points: confluence_points(agreeing),
                max: 20,
            },
            ScoreComponent {
                name: "oscillator",
                points: snapshot.rsi.last().map(oscillator_points).unwrap_or(0),
                max: 15,
            },
            ScoreComponent {
                name: "price_action",
                points: match structure.volatility {
                    Volatility::High => 10,
                    Volatility::Normal => 5,
                },
                max: 10,
            },
            ScoreComponent {
                name: "support_resistance",
                points: if structure.near_support || structure.near_resistance {
                    10
                } else if structure.within_level(LEVEL_CONTEXT) {
                    5
                } else {
                    0
                },
                max: 10,
            },
        ];
        let score = breakdown.iter().map(|c| c.points).sum();

        let direction = dominant
            .filter(|(_, count)| *count >= threshold)
            .filter(|_| score >= self.min_quality_score)
            .map(|(direction, _)| direction);

        QualityScore {
            score,
            direction,
            breakdown,
            threshold,
            agreeing,
        }
    }
}

fn structure_points(confidence: u32) -> u32 {
    match confidence {
        c if c >= 70 => 25,
        c if c >= 50 => 15,
        c if c >= 30 => 10,
        _ => 0,
    }
}

fn trend_points(strength: u32) -> u32 {
    match strength {
        t if t >= 25 => 20,
        t if t >= 15 => 15,
        t if t >= 5 => 10,
        _ => 0,
    }
}

/// Non-decreasing in `agreeing`
pub fn confluence_points(agreeing: u32) -> u32 {
    match agreeing {
        n if n >= 5 => 20,
        n if n >= 3 => 15,
        n if n >= 2 => 10,
        1 => 5,
        _ => 0,
    }
}

fn oscillator_points(rsi: f64) -> u32 {
    if (40.0..=60.0).contains(&rsi) {
        15
    } else if (30.0..=70.0).contains(&rsi) {
        10
    } else if !(25.0..=75.0).contains(&rsi) {
        8
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::structure::Bias;
    use crate::strategy::Signal;
    use pretty_assertions::assert_eq;

    fn structure(confidence: u32) -> MarketStructure {
        MarketStructure {
            bias: Bias::Bullish,
            confidence,
            trend_strength: 30,
            ..Default::default()
        }
    }

    fn buys(n: usize) -> SignalSet {
        (0..n).map(|_| Signal::buy(3, "agree")).collect()
    }

    #[test]
    fn test_total_equals_sum_of_components() {
        let scorer = QualityScorer::default();
        let q = scorer.score(
            StrategyKind::Scalping,
            &buys(4),
            &structure(72),
            &IndicatorSnapshot::default(),
        );
        assert_eq!(q.score, q.total());
        assert_eq!(q.breakdown.len(), 6);
        assert!(q.breakdown.iter().all(|c| c.points <= c.max));
        assert_eq!(q.breakdown.iter().map(|c| c.max).sum::<u32>(), 100);
    }

    #[test]
    fn test_five_scalping_signals_at_confidence_80() {
        let scorer = QualityScorer::default();
        let q = scorer.score(
            StrategyKind::Scalping,
            &buys(5),
            &structure(80),
            &IndicatorSnapshot::default(),
        );
        assert_eq!(q.threshold, 2);
        assert_eq!(q.agreeing, 5);
        assert_eq!(q.direction, Some(Direction::Buy));
        assert_eq!(q.component("confluence"), Some(20));
    }

    #[test]
    fn test_opposing_tie_gives_no_direction() {
        let scorer = QualityScorer::default();
        let mut set = buys(3);
        for _ in 0..3 {
            set.push(Signal::sell(3, "oppose"));
        }
        let q = scorer.score(
            StrategyKind::Hft,
            &set,
            &structure(90),
            &IndicatorSnapshot::default(),
        );
        assert_eq!(q.direction, None);
        assert_eq!(q.agreeing, 3);
    }

    #[test]
    fn test_below_threshold_gives_no_direction() {
        let scorer = QualityScorer::default();
        let q = scorer.score(
            StrategyKind::Intraday,
            &buys(4),
            &structure(10),
            &IndicatorSnapshot::default(),
        );
        assert_eq!(q.threshold, 5);
        assert_eq!(q.direction, None);
    }

    #[test]
    fn test_min_quality_score_gate() {
        let scorer = QualityScorer::new(ThresholdPolicy::default(), 95);
        let q = scorer.score(
            StrategyKind::Hft,
            &buys(5),
            &structure(90),
            &IndicatorSnapshot::default(),
        );
        assert!(q.score < 95);
        assert_eq!(q.direction, None);
    }

    #[test]
    fn test_confluence_monotone_in_agreeing_count() {
        let scorer = QualityScorer::default();
        let snap = IndicatorSnapshot::default();
        for kind in StrategyKind::ALL {
            let mut last = 0;
            for n in 0..10 {
                let q = scorer.score(kind, &buys(n), &structure(50), &snap);
                let points = q.component("confluence").unwrap_or(0);
                assert!(points >= last);
                last = points;
            }
        }
    }
}
