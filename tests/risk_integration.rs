//! Integration tests for TP/SL resolution and lot sizing
//!
//! To run these tests:
//! ```
//! cargo test --test risk_integration
//! ```

mod common;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use strategy_scheduler::paper::{forex_meta, PaperMarket, TickCurrencyConverter};
use strategy_scheduler::risk::{lot_for_risk, LevelContext, RiskParameter, RiskResolver, RiskUnit};
use strategy_scheduler::strategy::TradingSession;
use strategy_scheduler::{
    CurrencyConverter, Direction, InstrumentMeta, LevelKind, MarketDataSource, Result,
    SchedulerError,
};

/// Converter with a fixed rate table
struct FixedRates(HashMap<(String, String), Decimal>);

impl FixedRates {
    fn new(rates: &[(&str, &str, Decimal)]) -> Self {
        Self(
            rates
                .iter()
                .map(|(from, to, rate)| ((from.to_string(), to.to_string()), *rate))
                .collect(),
        )
    }
}

#[async_trait]
impl CurrencyConverter for FixedRates {
    async fn rate(&self, from: &str, to: &str) -> Result<Decimal> {
        self.0
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| SchedulerError::DataUnavailable(format!("{}/{}", from, to)))
    }
}

fn eurusd() -> InstrumentMeta {
    forex_meta("EURUSD")
}

// ============================================================================
// Unit Resolution Tests
// ============================================================================

#[tokio::test]
async fn test_config_shorthand_resolves_per_unit() {
    let meta = eurusd();
    let resolver = RiskResolver::new("USD");
    let ctx = LevelContext::new(LevelKind::TakeProfit, Direction::Buy, &meta, dec!(1.1000), dec!(1));

    let cases = [
        ("20", dec!(1.1020)),
        ("20 pips", dec!(1.1020)),
        ("1%", dec!(1.1110)),
        ("200 USD", dec!(1.1020)),
    ];
    for (text, expected) in cases {
        let param = RiskParameter::parse(text).unwrap();
        let level = resolver.resolve(&param, &ctx).await.unwrap();
        assert_eq!(level.price, expected, "{}", text);
    }

    let fixed = RiskParameter::price(dec!(1.1055));
    assert_eq!(resolver.resolve(&fixed, &ctx).await.unwrap().price, dec!(1.1055));
}

#[tokio::test]
async fn test_sell_stop_loss_sits_above_entry() {
    let meta = eurusd();
    let resolver = RiskResolver::new("USD");
    let ctx = LevelContext::new(LevelKind::StopLoss, Direction::Sell, &meta, dec!(1.1000), dec!(0.1));

    let level = resolver
        .resolve(&RiskParameter::pips("15"), &ctx)
        .await
        .unwrap();
    assert_eq!(level.price, dec!(1.1015));
    assert_eq!(level.distance, dec!(0.0015));
    assert_eq!(level.unit, RiskUnit::Pips);
}

#[tokio::test]
async fn test_jpy_pair_rounds_to_two_digits() {
    let meta = forex_meta("USDJPY");
    let resolver = RiskResolver::new("USD");
    let ctx = LevelContext::new(LevelKind::TakeProfit, Direction::Buy, &meta, dec!(150.00), dec!(0.1));

    let pips = resolver.resolve(&RiskParameter::pips("25"), &ctx).await.unwrap();
    assert_eq!(pips.price, dec!(150.25));

    let percent = resolver
        .resolve(&RiskParameter::percent("1"), &ctx)
        .await
        .unwrap();
    assert_eq!(percent.price, dec!(151.50));
}

#[tokio::test]
async fn test_session_scale_widens_distance() {
    let meta = eurusd();
    let resolver = RiskResolver::new("USD");
    let scale = TradingSession::OverlapLondonNy.multipliers().take_profit;
    let ctx = LevelContext::new(LevelKind::TakeProfit, Direction::Buy, &meta, dec!(1.1000), dec!(0.1))
        .with_scale(scale);

    let level = resolver.resolve(&RiskParameter::pips("25"), &ctx).await.unwrap();
    assert_eq!(level.price, dec!(1.1030));
}

// ============================================================================
// Currency Conversion Tests
// ============================================================================

#[tokio::test]
async fn test_foreign_currency_level_uses_converter() {
    let meta = eurusd();
    let resolver = RiskResolver::new("USD")
        .with_converter(Arc::new(FixedRates::new(&[("EUR", "USD", dec!(1.25))])));
    let ctx = LevelContext::new(LevelKind::TakeProfit, Direction::Buy, &meta, dec!(1.1000), dec!(1));

    // 160 EUR = 200 USD = 20 pips at 10 USD per pip
    let level = resolver
        .resolve(&RiskParameter::parse("160 EUR").unwrap(), &ctx)
        .await
        .unwrap();
    assert_eq!(level.price, dec!(1.1020));
}

#[tokio::test]
async fn test_missing_converter_is_configuration_error() {
    let meta = eurusd();
    let resolver = RiskResolver::new("USD");
    let ctx = LevelContext::new(LevelKind::StopLoss, Direction::Buy, &meta, dec!(1.1000), dec!(1));

    let err = resolver
        .resolve(&RiskParameter::currency("100", "GBP"), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Configuration(_)));
}

#[tokio::test]
async fn test_paper_quotes_drive_conversion() {
    let market: Arc<dyn MarketDataSource> = Arc::new(PaperMarket::new());
    let converter = Arc::new(TickCurrencyConverter::new(Arc::clone(&market)));
    let resolver = RiskResolver::new("USD").with_converter(converter);

    let meta = eurusd();
    let tick = market.fetch_tick("EURUSD").await.unwrap();
    let ctx = LevelContext::new(LevelKind::TakeProfit, Direction::Buy, &meta, tick.ask, dec!(1));

    let level = resolver
        .resolve(&RiskParameter::currency("200", "GBP"), &ctx)
        .await
        .unwrap();
    assert!(level.price > tick.ask);
    // GBP is worth more than USD, so 200 GBP buys more than 20 pips
    assert!(level.distance > dec!(0.0020));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
async fn test_rejections_are_explicit() {
    let meta = eurusd();
    let resolver = RiskResolver::new("USD");
    let buy_tp = LevelContext::new(LevelKind::TakeProfit, Direction::Buy, &meta, dec!(1.1000), dec!(1));

    let rejected = [
        RiskParameter::pips("-5"),
        RiskParameter::pips("0"),
        RiskParameter::pips("abc"),
        RiskParameter::percent("75"),
        RiskParameter::pips("0.5"),
        RiskParameter::price(dec!(1.0950)),
    ];
    for param in rejected {
        let err = resolver.resolve(&param, &buy_tp).await.unwrap_err();
        assert!(
            matches!(err, SchedulerError::InvalidRiskParameter(_)),
            "{} gave {:?}",
            param,
            err
        );
    }
}

// ============================================================================
// Lot Sizing Tests
// ============================================================================

#[test]
fn test_lot_for_risk_matches_stop_loss_loss() {
    let meta = eurusd();
    // 1% of 10k over a 20-pip stop at 10 USD per pip per lot
    let lot = lot_for_risk(dec!(10000), dec!(1), dec!(0.0020), &meta).unwrap();
    assert_eq!(lot, dec!(0.5));

    // Below volume_min clamps up, not to zero
    let tiny = lot_for_risk(dec!(10), dec!(0.1), dec!(0.0100), &meta).unwrap();
    assert_eq!(tiny, dec!(0.01));
}
