//! Pip value, risk-based lot sizing and reward/risk ratios

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::common::errors::{Result, SchedulerError};
use crate::common::types::InstrumentMeta;

/// Fallback units per lot when the instrument reports no tick value
const STANDARD_LOT_UNITS: Decimal = dec!(100000);

/// Account-currency value of one pip for `lot` lots
///
/// Uses `tick_value / tick_size` when the broker supplies tick data, else
/// assumes a standard 100k lot.
pub fn pip_value_per_lot(meta: &InstrumentMeta, lot: Decimal) -> Decimal {
    if meta.tick_value > Decimal::ZERO && meta.tick_size > Decimal::ZERO {
        meta.tick_value / meta.tick_size * meta.point * lot
    } else {
        meta.point * STANDARD_LOT_UNITS * lot
    }
}

/// Lot size whose stop-loss loss equals `risk_percent` of `balance`
///
/// Rounded down to `volume_step` and clamped to the instrument's volume range.
pub fn lot_for_risk(
    balance: Decimal,
    risk_percent: Decimal,
    sl_distance: Decimal,
    meta: &InstrumentMeta,
) -> Result<Decimal> {
    if balance <= Decimal::ZERO || risk_percent <= Decimal::ZERO || sl_distance <= Decimal::ZERO {
        return Err(SchedulerError::invalid_risk(format!(
            "lot sizing needs positive inputs (balance {}, risk {}%, sl distance {})",
            balance, risk_percent, sl_distance
        )));
    }
    if meta.point <= Decimal::ZERO {
        return Err(SchedulerError::invalid_risk(format!(
            "{} has no point size",
            meta.symbol
        )));
    }

    let per_lot = pip_value_per_lot(meta, Decimal::ONE);
    let lot = balance
        .checked_mul(risk_percent)
        .and_then(|amount| amount.checked_div(dec!(100)))
        .zip(
            sl_distance
                .checked_div(meta.point)
                .and_then(|pips| pips.checked_mul(per_lot)),
        )
        .and_then(|(amount, loss_per_lot)| amount.checked_div(loss_per_lot))
        .ok_or_else(|| {
            SchedulerError::invalid_risk(format!(
                "{}: lot sizing overflows (balance {}, risk {}%, sl distance {})",
                meta.symbol, balance, risk_percent, sl_distance
            ))
        })?;
    Ok(normalize_lot(lot, meta))
}

/// Round `lot` down to the volume step and clamp it to the volume range
pub fn normalize_lot(lot: Decimal, meta: &InstrumentMeta) -> Decimal {
    let stepped = if meta.volume_step > Decimal::ZERO {
        match lot.checked_div(meta.volume_step) {
            Some(steps) => steps.floor() * meta.volume_step,
            None => meta.volume_max,
        }
    } else {
        lot
    };
    stepped.max(meta.volume_min).min(meta.volume_max).normalize()
}

/// Reward over risk; `None` when the stop sits on the entry
pub fn risk_reward(entry: Decimal, take_profit: Decimal, stop_loss: Decimal) -> Option<Decimal> {
    let risk = (entry - stop_loss).abs();
    if risk.is_zero() {
        return None;
    }
    Some(((take_profit - entry).abs() / risk).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pip_value_from_tick_data() {
        let meta = InstrumentMeta::forex("EURUSD");
        // 10 / 0.0001 * 0.0001 = 10 per lot
        assert_eq!(pip_value_per_lot(&meta, dec!(1)), dec!(10));
        assert_eq!(pip_value_per_lot(&meta, dec!(0.1)), dec!(1));
    }

    #[test]
    fn test_requoted_instrument_keeps_pip_value() {
        let meta = InstrumentMeta::forex("USDJPY").with_point(dec!(0.01), 2);
        assert_eq!(meta.tick_size, meta.point);
        assert_eq!(pip_value_per_lot(&meta, dec!(1)), dec!(10));
    }

    #[test]
    fn test_pip_value_fallback() {
        let mut meta = InstrumentMeta::forex("EURUSD");
        meta.tick_value = Decimal::ZERO;
        assert_eq!(pip_value_per_lot(&meta, dec!(1)), dec!(10));
    }

    #[test]
    fn test_lot_for_risk() {
        let meta = InstrumentMeta::forex("EURUSD");
        // 1% of 10k = 100; 20 pips * 10 per lot = 200 per lot → 0.5
        let lot = lot_for_risk(dec!(10000), dec!(1), dec!(0.0020), &meta).unwrap();
        assert_eq!(lot, dec!(0.5));
    }

    #[test]
    fn test_lot_for_risk_clamps_and_steps() {
        let meta = InstrumentMeta::forex("EURUSD");
        let tiny = lot_for_risk(dec!(100), dec!(0.1), dec!(0.0100), &meta).unwrap();
        assert_eq!(tiny, meta.volume_min);
        let huge = lot_for_risk(dec!(100000000), dec!(5), dec!(0.0010), &meta).unwrap();
        assert_eq!(huge, meta.volume_max);
        let stepped = lot_for_risk(dec!(10000), dec!(1), dec!(0.0030), &meta).unwrap();
        assert_eq!(stepped, dec!(0.33));
        assert!(lot_for_risk(dec!(0), dec!(1), dec!(0.001), &meta).is_err());
        assert!(lot_for_risk(Decimal::MAX, dec!(50), dec!(0.001), &meta).is_err());
    }

    #[test]
    fn test_normalize_lot() {
        let meta = InstrumentMeta::forex("EURUSD");
        assert_eq!(normalize_lot(dec!(0.075), &meta), dec!(0.07));
        assert_eq!(normalize_lot(dec!(0.004), &meta), dec!(0.01));
    }

    #[test]
    fn test_risk_reward() {
        assert_eq!(
            risk_reward(dec!(1.1000), dec!(1.1030), dec!(1.0985)),
            Some(dec!(2))
        );
        assert_eq!(risk_reward(dec!(1.1), dec!(1.2), dec!(1.1)), None);
    }
}
