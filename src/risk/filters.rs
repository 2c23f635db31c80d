//! Pre-trade market filters
//!
//! - [`SpreadLimits`]: widest spread, in pips, each asset class may trade at
//! - [`MarketConditions`]: volatility class and regime read from the
//!   indicator snapshot. They scale lot and TP/SL distances and hold back
//!   intents while volatility is extreme.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::common::types::{InstrumentMeta, Tick};
use crate::indicators::IndicatorSnapshot;

const FOREX_MAJORS: [&str; 7] = [
    "EURUSD", "GBPUSD", "USDJPY", "USDCHF", "AUDUSD", "USDCAD", "NZDUSD",
];
const CRYPTO: [&str; 5] = ["BTCUSD", "ETHUSD", "LTCUSD", "XRPUSD", "BCHUSD"];
const INDICES: [&str; 7] = ["US30", "US500", "NAS100", "GER30", "UK100", "FRA40", "AUS200"];

/// EMA 20/50 separation, relative to EMA 50, above which the market trends
const TREND_SEPARATION: f64 = 0.02;
/// 20-bar high-low range, relative to the close, below which it ranges
const RANGE_WIDTH: f64 = 0.01;

/// Smallest lot volatility scaling may shrink a position to
const MIN_ADAPTIVE_LOT: Decimal = dec!(0.01);

/// Maximum spread in pips per asset class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadLimits {
    pub enabled: bool,
    pub forex_major: Decimal,
    pub forex_minor: Decimal,
    pub jpy_pairs: Decimal,
    pub gold: Decimal,
    pub silver: Decimal,
    pub oil: Decimal,
    pub crypto: Decimal,
    pub indices: Decimal,
}

impl Default for SpreadLimits {
    fn default() -> Self {
        Self {
            enabled: true,
            forex_major: dec!(3.0),
            forex_minor: dec!(5.0),
            jpy_pairs: dec!(2.5),
            gold: dec!(5.0),
            silver: dec!(8.0),
            oil: dec!(4.0),
            crypto: dec!(50.0),
            indices: dec!(10.0),
        }
    }
}

impl SpreadLimits {
    pub fn max_spread_pips(&self, symbol: &str) -> Decimal {
        let symbol = symbol.to_ascii_uppercase();
        let has = |needle: &str| symbol.contains(needle);

        if FOREX_MAJORS.iter().any(|p| has(p)) {
            self.forex_major
        } else if has("JPY") {
            self.jpy_pairs
        } else if has("XAU") || has("GOLD") {
            self.gold
        } else if has("XAG") || has("SILVER") {
            self.silver
        } else if has("OIL") {
            self.oil
        } else if CRYPTO.iter().any(|c| has(c)) {
            self.crypto
        } else if INDICES.iter().any(|i| has(i)) {
            self.indices
        } else {
            self.forex_minor
        }
    }

    /// Why `tick` is too wide to trade, if it is
    pub fn check(&self, symbol: &str, tick: &Tick, meta: &InstrumentMeta) -> Option<String> {
        if !self.enabled || meta.point <= Decimal::ZERO {
            return None;
        }
        let limit = self.max_spread_pips(symbol);
        match (tick.ask - tick.bid).checked_div(meta.point) {
            Some(spread) if spread <= limit => None,
            Some(spread) => Some(format!(
                "spread {} pips above the {} pip limit",
                spread.round_dp(1),
                limit
            )),
            None => Some(format!("spread {} is unmeasurable", tick.ask - tick.bid)),
        }
    }
}

/// Current ATR relative to its recent average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityClass {
    Low,
    Normal,
    High,
    Extreme,
}

impl VolatilityClass {
    /// Classify an ATR ratio; no ratio (short history) reads as normal
    pub fn from_atr_ratio(ratio: Option<f64>) -> Self {
        match ratio {
            Some(r) if r >= 3.0 => VolatilityClass::Extreme,
            Some(r) if r >= 2.0 => VolatilityClass::High,
            Some(r) if r <= 0.5 => VolatilityClass::Low,
            _ => VolatilityClass::Normal,
        }
    }

    pub fn lot_multiplier(self) -> Decimal {
        match self {
            VolatilityClass::Low => dec!(1.2),
            VolatilityClass::Normal => Decimal::ONE,
            VolatilityClass::High => dec!(0.7),
            VolatilityClass::Extreme => dec!(0.3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Normal,
    Trending,
    Ranging,
    HighVolatility,
    NewsSpike,
}

impl MarketRegime {
    /// Volatility decides first; otherwise EMA separation, then range width
    pub fn classify(volatility: VolatilityClass, snapshot: &IndicatorSnapshot) -> Self {
        match volatility {
            VolatilityClass::Extreme => return MarketRegime::NewsSpike,
            VolatilityClass::High => return MarketRegime::HighVolatility,
            _ => {}
        }

        let (Some(fast), Some(slow), Some(close)) =
            (snapshot.ema(20), snapshot.ema(50), snapshot.last_close())
        else {
            return MarketRegime::Normal;
        };
        if slow > 0.0 && (fast - slow).abs() / slow > TREND_SEPARATION {
            return MarketRegime::Trending;
        }
        match (snapshot.support, snapshot.resistance) {
            (Some(low), Some(high)) if close > 0.0 && (high - low) / close < RANGE_WIDTH => {
                MarketRegime::Ranging
            }
            _ => MarketRegime::Normal,
        }
    }

    /// (take profit, stop loss) distance multipliers
    pub fn level_multipliers(self) -> (Decimal, Decimal) {
        match self {
            MarketRegime::Normal => (Decimal::ONE, Decimal::ONE),
            MarketRegime::Trending => (dec!(1.5), dec!(0.8)),
            MarketRegime::Ranging => (dec!(0.8), dec!(1.2)),
            MarketRegime::HighVolatility => (dec!(1.2), dec!(1.5)),
            MarketRegime::NewsSpike => (dec!(0.5), dec!(2.0)),
        }
    }
}

/// Volatility-driven adjustments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveSettings {
    pub enabled: bool,
    /// Emit nothing while volatility is extreme
    pub hold_on_extreme: bool,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hold_on_extreme: true,
        }
    }
}

/// What one snapshot says about the market right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketConditions {
    pub volatility: VolatilityClass,
    pub regime: MarketRegime,
}

impl MarketConditions {
    pub fn read(snapshot: &IndicatorSnapshot) -> Self {
        let volatility = VolatilityClass::from_atr_ratio(snapshot.atr_ratio);
        Self {
            volatility,
            regime: MarketRegime::classify(volatility, snapshot),
        }
    }

    /// `base` scaled by volatility, kept within `[0.01, 2 × base]`
    pub fn adaptive_lot(&self, base: Decimal) -> Decimal {
        base.saturating_mul(self.volatility.lot_multiplier())
            .min(base.saturating_mul(dec!(2)))
            .max(MIN_ADAPTIVE_LOT)
    }

    pub fn is_extreme(&self) -> bool {
        self.volatility == VolatilityClass::Extreme
    }
}
