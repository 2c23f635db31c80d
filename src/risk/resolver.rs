//! Risk Parameter Resolver
//!
//! Turns a [`RiskParameter`] into a broker-valid absolute price:
//!
//! ```text
//! raw ──► value() ──► unit branch ──► distance ──► entry ± distance ──► round(digits) ──► validate
//!                     pips     raw × point
//!                     percent  entry × raw / 100          (0 < raw ≤ 50)
//!                     currency amount / pip value × point (converted to account currency)
//!                     price    raw is the level
//! ```
//!
//! Validation failures are explicit `InvalidRiskParameter` errors, never clamps.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::common::errors::{Result, SchedulerError};
use crate::common::traits::CurrencyConverter;
use crate::common::types::{Direction, InstrumentMeta, LevelKind};
use crate::risk::sizing::pip_value_per_lot;
use crate::risk::units::{is_supported_currency, RiskParameter, RiskUnit};

/// Largest accepted percent distance
pub const MAX_PERCENT: Decimal = dec!(50);

/// A validated absolute level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLevel {
    pub price: Decimal,
    /// Absolute gap between `price` and entry after rounding
    pub distance: Decimal,
    /// Unit the level was derived from
    pub unit: RiskUnit,
}

/// Everything about the order a level is resolved against
#[derive(Debug, Clone)]
pub struct LevelContext<'a> {
    pub kind: LevelKind,
    pub direction: Direction,
    pub meta: &'a InstrumentMeta,
    /// Entry price; the current quote for market orders
    pub entry: Decimal,
    /// Position size, used by currency-denominated levels
    pub lot: Decimal,
    /// Multiplier on non-price distances, e.g. a session adjustment
    pub scale: Decimal,
}

impl<'a> LevelContext<'a> {
    pub fn new(
        kind: LevelKind,
        direction: Direction,
        meta: &'a InstrumentMeta,
        entry: Decimal,
        lot: Decimal,
    ) -> Self {
        Self {
            kind,
            direction,
            meta,
            entry,
            lot,
            scale: Decimal::ONE,
        }
    }

    pub fn with_scale(mut self, scale: Decimal) -> Self {
        self.scale = scale;
        self
    }
}

/// Resolver for one account
///
/// Holds no per-symbol state and caches nothing; metadata caching belongs to
/// the caller's [`InstrumentMetadataSource`](crate::common::traits::InstrumentMetadataSource).
#[derive(Clone)]
pub struct RiskResolver {
    account_currency: String,
    converter: Option<Arc<dyn CurrencyConverter>>,
}

impl std::fmt::Debug for RiskResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskResolver")
            .field("account_currency", &self.account_currency)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

impl RiskResolver {
    pub fn new(account_currency: impl Into<String>) -> Self {
        Self {
            account_currency: account_currency.into().to_uppercase(),
            converter: None,
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn CurrencyConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn account_currency(&self) -> &str {
        &self.account_currency
    }

    /// Resolve `param`, looking up an exchange rate when the level is
    /// denominated in a foreign currency
    pub async fn resolve(&self, param: &RiskParameter, ctx: &LevelContext<'_>) -> Result<ResolvedLevel> {
        let rate = match &param.unit {
            RiskUnit::Currency(code) => Some(self.rate_to_account(code).await?),
            _ => None,
        };
        self.resolve_with_rate(param, ctx, rate)
    }

    /// Resolve without any I/O. Foreign-currency levels need `rate`, the
    /// number of account-currency units per unit of the level's currency.
    pub fn resolve_with_rate(
        &self,
        param: &RiskParameter,
        ctx: &LevelContext<'_>,
        rate: Option<Decimal>,
    ) -> Result<ResolvedLevel> {
        let value = param.value()?;
        let meta = ctx.meta;
        let sign = ctx.kind.side_sign(ctx.direction);

        if ctx.entry <= Decimal::ZERO {
            return Err(SchedulerError::invalid_risk(format!(
                "{}: entry price {} is not positive",
                meta.symbol, ctx.entry
            )));
        }

        let target = match &param.unit {
            RiskUnit::Price => Some(value),
            RiskUnit::Pips => checked_product(&[sign, value, ctx.scale, meta.point])
                .and_then(|d| ctx.entry.checked_add(d)),
            RiskUnit::Percent => {
                if value > MAX_PERCENT {
                    return Err(SchedulerError::invalid_risk(format!(
                        "{}% is outside (0, {}]",
                        value, MAX_PERCENT
                    )));
                }
                checked_product(&[sign, ctx.entry, value, ctx.scale])
                    .and_then(|d| d.checked_div(dec!(100)))
                    .and_then(|d| ctx.entry.checked_add(d))
            }
            RiskUnit::Currency(code) => {
                let rate = self.currency_rate(code, rate)?;
                let pip_value = pip_value_per_lot(meta, Decimal::ONE)
                    .checked_mul(ctx.lot)
                    .filter(|v| *v > Decimal::ZERO)
                    .ok_or_else(|| {
                        SchedulerError::invalid_risk(format!(
                            "{}: no usable pip value for lot {}",
                            meta.symbol, ctx.lot
                        ))
                    })?;
                checked_product(&[value, rate, ctx.scale])
                    .and_then(|amount| amount.checked_div(pip_value))
                    .and_then(|pips| checked_product(&[sign, pips, meta.point]))
                    .and_then(|d| ctx.entry.checked_add(d))
            }
        };
        let target = target.ok_or_else(|| {
            SchedulerError::invalid_risk(format!(
                "{} {} {} overflows the price range",
                meta.symbol, ctx.kind, param
            ))
        })?;

        let price =
            target.round_dp_with_strategy(meta.digits, RoundingStrategy::MidpointAwayFromZero);
        let level = self.validate(price, ctx, &param.unit)?;
        debug!(
            symbol = %meta.symbol,
            kind = %ctx.kind,
            direction = %ctx.direction,
            raw = %param.raw,
            unit = %param.unit,
            price = %level.price,
            "Resolved risk level"
        );
        Ok(level)
    }

    fn validate(
        &self,
        price: Decimal,
        ctx: &LevelContext<'_>,
        unit: &RiskUnit,
    ) -> Result<ResolvedLevel> {
        if price <= Decimal::ZERO {
            return Err(SchedulerError::invalid_risk(format!(
                "{} {} resolves to non-positive price {}",
                ctx.meta.symbol, ctx.kind, price
            )));
        }

        let offset = price - ctx.entry;
        if offset * ctx.kind.side_sign(ctx.direction) <= Decimal::ZERO {
            return Err(SchedulerError::invalid_risk(format!(
                "{} {} {} at {} is on the wrong side of entry {}",
                ctx.meta.symbol, ctx.direction, ctx.kind, price, ctx.entry
            )));
        }

        let distance = offset.abs();
        let min_distance = ctx.meta.min_stop_distance();
        if distance < min_distance {
            return Err(SchedulerError::invalid_risk(format!(
                "{} {} distance {} is below broker minimum {}",
                ctx.meta.symbol, ctx.kind, distance, min_distance
            )));
        }

        Ok(ResolvedLevel {
            price,
            distance,
            unit: unit.clone(),
        })
    }

    fn currency_rate(&self, code: &str, rate: Option<Decimal>) -> Result<Decimal> {
        if !is_supported_currency(code) {
            return Err(SchedulerError::invalid_risk(format!(
                "unsupported currency '{}'",
                code
            )));
        }
        let rate = if code == self.account_currency {
            Decimal::ONE
        } else {
            rate.ok_or_else(|| {
                SchedulerError::invalid_risk(format!(
                    "no {}/{} rate available",
                    code, self.account_currency
                ))
            })?
        };
        if rate <= Decimal::ZERO {
            return Err(SchedulerError::invalid_risk(format!(
                "{}/{} rate {} is not positive",
                code, self.account_currency, rate
            )));
        }
        Ok(rate)
    }

    async fn rate_to_account(&self, code: &str) -> Result<Decimal> {
        if !is_supported_currency(code) || code == self.account_currency {
            return Ok(Decimal::ONE);
        }
        match &self.converter {
            Some(converter) => converter.rate(code, &self.account_currency).await,
            None => Err(SchedulerError::Configuration(format!(
                "currency level in {} needs a converter to {}",
                code, self.account_currency
            ))),
        }
    }
}

/// Product of `factors`, or `None` once it leaves the `Decimal` range
fn checked_product(factors: &[Decimal]) -> Option<Decimal> {
    factors
        .iter()
        .try_fold(Decimal::ONE, |acc, factor| acc.checked_mul(*factor))
}
