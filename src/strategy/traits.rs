use crate::indicators::IndicatorSnapshot;
use crate::strategy::types::{SignalSet, StrategyKind};

/// Core signal generator trait
///
/// Each strategy family turns an indicator snapshot and the current price
/// into a set of directional signals. Generators are pure: no I/O, no state
/// between calls, and no knowledge of how signals are scored later.
///
/// # Implementation Notes
///
/// - Missing indicators (short history) must simply produce fewer signals
/// - Rule weights live in the generator; thresholds do not
/// - The scheduler treats every generator uniformly through this trait
///
/// # Example
///
/// ```ignore
/// struct Breakout;
///
/// impl SignalGenerator for Breakout {
///     fn kind(&self) -> StrategyKind { StrategyKind::Intraday }
///
///     fn generate(&self, snapshot: &IndicatorSnapshot, price: f64) -> SignalSet {
///         let mut set = SignalSet::new();
///         set.push_opt(Signal::from_sign(snapshot.breakout(), 5, "breakout"));
///         set
///     }
/// }
/// ```
pub trait SignalGenerator: Send + Sync {
    /// Which strategy family this generator implements
    fn kind(&self) -> StrategyKind;

    /// Evaluate the rule set against one snapshot
    fn generate(&self, snapshot: &IndicatorSnapshot, current_price: f64) -> SignalSet;
}

/// Shared generator reference for dynamic dispatch
pub type GeneratorRef = &'static dyn SignalGenerator;

impl StrategyKind {
    /// The generator implementing this family's rules
    pub fn generator(self) -> GeneratorRef {
        match self {
            StrategyKind::Hft => &super::hft::UltraShortGenerator,
            StrategyKind::Scalping => &super::scalping::ShortHorizonGenerator,
            StrategyKind::Intraday => &super::intraday::MediumHorizonGenerator,
            StrategyKind::Arbitrage => &super::mean_reversion::MeanReversionGenerator,
        }
    }

    /// Shorthand for `self.generator().generate(..)`
    pub fn generate(self, snapshot: &IndicatorSnapshot, current_price: f64) -> SignalSet {
        self.generator().generate(snapshot, current_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_kinds_match() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.generator().kind(), kind);
        }
    }

    #[test]
    fn test_empty_snapshot_produces_no_signals() {
        let snap = IndicatorSnapshot::default();
        for kind in StrategyKind::ALL {
            assert!(kind.generate(&snap, 1.1).is_empty(), "{} fired on nothing", kind);
        }
    }
}
