//! TP/SL input values and their units
//!
//! A [`RiskParameter`] is caller-owned input. It is parsed and validated on
//! every resolution and never mutated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::errors::{Result, SchedulerError};

/// Currency codes accepted for currency-denominated levels
pub const SUPPORTED_CURRENCIES: [&str; 8] = ["USD", "EUR", "GBP", "CAD", "AUD", "JPY", "CHF", "NZD"];

const PIP_SUFFIXES: [&str; 3] = ["pips", "pip", "p"];

/// How a raw value is interpreted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskUnit {
    Pips,
    Price,
    Percent,
    /// Amount in the given ISO currency code
    Currency(String),
}

impl std::fmt::Display for RiskUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskUnit::Pips => write!(f, "pips"),
            RiskUnit::Price => write!(f, "price"),
            RiskUnit::Percent => write!(f, "percent"),
            RiskUnit::Currency(code) => write!(f, "currency({})", code),
        }
    }
}

/// A raw TP/SL value with its unit
///
/// Deserializes from either `{ raw = "20", unit = "pips" }` or a shorthand
/// string such as `"20pips"`, `"1.5%"` or `"100EUR"` (see [`RiskParameter::parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RiskParameterRepr")]
pub struct RiskParameter {
    pub raw: String,
    pub unit: RiskUnit,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RiskParameterRepr {
    Full { raw: String, unit: RiskUnit },
    Text(String),
    Number(f64),
}

impl TryFrom<RiskParameterRepr> for RiskParameter {
    type Error = SchedulerError;

    fn try_from(repr: RiskParameterRepr) -> Result<Self> {
        match repr {
            RiskParameterRepr::Full { raw, unit } => Ok(RiskParameter::new(raw, unit)),
            RiskParameterRepr::Text(text) => RiskParameter::parse(&text),
            RiskParameterRepr::Number(n) => Ok(RiskParameter::pips(n.to_string())),
        }
    }
}

impl RiskParameter {
    pub fn new(raw: impl Into<String>, unit: RiskUnit) -> Self {
        Self {
            raw: raw.into(),
            unit,
        }
    }

    pub fn pips(raw: impl Into<String>) -> Self {
        Self::new(raw, RiskUnit::Pips)
    }

    pub fn price(price: Decimal) -> Self {
        Self::new(price.to_string(), RiskUnit::Price)
    }

    pub fn percent(raw: impl Into<String>) -> Self {
        Self::new(raw, RiskUnit::Percent)
    }

    pub fn currency(raw: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(raw, RiskUnit::Currency(code.into().to_uppercase()))
    }

    /// Infer the unit from a shorthand string. A bare number means pips.
    ///
    /// The raw text is kept as given; validation happens in [`value`](Self::value).
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SchedulerError::invalid_risk("empty value"));
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.ends_with('%') {
            return Ok(Self::percent(trimmed));
        }
        let code: String = lower
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<String>()
            .to_ascii_uppercase();
        if is_supported_currency(&code) {
            return Ok(Self::currency(trimmed, code));
        }
        if code.is_empty() || PIP_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            return Ok(Self::pips(trimmed));
        }
        Err(SchedulerError::invalid_risk(format!(
            "unrecognized unit in '{}'",
            trimmed
        )))
    }

    /// The validated positive number inside `raw`
    ///
    /// Rejects empty, non-numeric, zero and negative values before any
    /// unit-specific logic runs.
    pub fn value(&self) -> Result<Decimal> {
        let trimmed = self.raw.trim();
        if trimmed.is_empty() {
            return Err(SchedulerError::invalid_risk("empty value"));
        }
        let number = match &self.unit {
            RiskUnit::Pips => strip_suffix_ci(trimmed, &PIP_SUFFIXES),
            RiskUnit::Percent => trimmed.strip_suffix('%').unwrap_or(trimmed),
            RiskUnit::Price => trimmed,
            RiskUnit::Currency(code) => {
                let stripped = strip_suffix_ci(trimmed, &[code.as_str()]);
                if stripped.len() == trimmed.len() && trimmed.ends_with(|c: char| c.is_ascii_alphabetic()) {
                    return Err(SchedulerError::invalid_risk(format!(
                        "'{}' is not denominated in {}",
                        trimmed, code
                    )));
                }
                stripped
            }
        }
        .trim();

        let value = Decimal::from_str(number).map_err(|_| {
            SchedulerError::invalid_risk(format!("'{}' is not a number", self.raw))
        })?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(SchedulerError::invalid_risk(format!(
                "negative value '{}'",
                self.raw
            )));
        }
        if value.is_zero() {
            return Err(SchedulerError::invalid_risk(format!(
                "zero value '{}'",
                self.raw
            )));
        }
        Ok(value)
    }
}

impl std::fmt::Display for RiskParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.raw, self.unit)
    }
}

pub fn is_supported_currency(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// Remove the first matching suffix, ignoring ASCII case
fn strip_suffix_ci<'a>(text: &'a str, suffixes: &[&str]) -> &'a str {
    for suffix in suffixes {
        if text.len() >= suffix.len() {
            let split = text.len() - suffix.len();
            if text.is_char_boundary(split) && text[split..].eq_ignore_ascii_case(suffix) {
                return &text[..split];
            }
        }
    }
    text
}
