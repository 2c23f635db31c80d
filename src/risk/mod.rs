//! TP/SL resolution and position sizing
//!
//! - [`RiskParameter`] / [`RiskUnit`]: caller-supplied raw values
//! - [`RiskResolver`]: raw value to validated absolute price
//! - [`sizing`]: pip value, risk-based lot size, reward/risk
//! - [`filters`]: spread limits and volatility-regime adjustments

pub mod filters;
pub mod resolver;
pub mod sizing;
pub mod units;

pub use filters::{
    AdaptiveSettings, MarketConditions, MarketRegime, SpreadLimits, VolatilityClass,
};
pub use resolver::{LevelContext, ResolvedLevel, RiskResolver, MAX_PERCENT};
pub use sizing::{lot_for_risk, normalize_lot, pip_value_per_lot, risk_reward};
pub use units::{is_supported_currency, RiskParameter, RiskUnit, SUPPORTED_CURRENCIES};
