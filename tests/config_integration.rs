//! Integration tests for configuration loading
//!
//! Environment variables are process-wide, so everything touching them lives
//! in a single test.

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use strategy_scheduler::risk::{RiskParameter, RiskUnit};
use strategy_scheduler::{load_config, SchedulerError, StrategyKind};

fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "strategy_scheduler_{}_{}.toml",
        name,
        std::process::id()
    ));
    std::fs::write(&path, contents).unwrap();
    path
}

const CONFIG_TOML: &str = r#"
account_currency = "EUR"
symbols = ["EURUSD", "GBPUSD"]
active_strategies = ["scalping", "intraday"]
min_quality_score = 40

[scheduler]
pool_size = 3
batch_size = 1
task_deadline_ms = 2500

[strategies.intraday]
lot_size = "0.2"
take_profit = "1.5%"
stop_loss = { raw = "30", unit = "pips" }

[strategies.scalping]
lot_size = "0.05"
take_profit = "50 EUR"
stop_loss = 5

[news]
major_lookahead_minutes = 30

[[news.windows]]
start = "13:00"
end = "13:45"
weekday = "Thu"
label = "ECB decision"

[spread]
forex_major = "2.0"
"#;

// ============================================================================
// File and Environment Tests
// ============================================================================

#[test]
fn test_file_then_environment_layering() {
    let path = write_config("layering", CONFIG_TOML);
    let path_str = path.to_string_lossy().to_string();

    let config = tokio_test::assert_ok!(load_config(Some(&path_str)));
    assert_eq!(config.account_currency, "EUR");
    assert_eq!(config.symbols, vec!["EURUSD", "GBPUSD"]);
    assert_eq!(
        config.active_strategies,
        vec![StrategyKind::Scalping, StrategyKind::Intraday]
    );
    assert_eq!(config.min_quality_score, 40);
    assert_eq!(config.scheduler.pool_size, 3);
    assert_eq!(config.scheduler.batch_size, 1);
    // Untouched keys keep their defaults
    assert_eq!(config.scheduler.bar_count, 250);

    let intraday = &config.strategies.intraday;
    assert_eq!(intraday.lot_size, dec!(0.2));
    assert_eq!(intraday.take_profit.unit, RiskUnit::Percent);
    assert_eq!(intraday.stop_loss, RiskParameter::pips("30"));

    let scalping = &config.strategies.scalping;
    assert_eq!(scalping.take_profit.unit, RiskUnit::Currency("EUR".into()));
    assert_eq!(scalping.stop_loss.value().unwrap(), dec!(5));
    assert_eq!(config.strategies.hft.lot_size, dec!(0.01));

    assert_eq!(config.news.windows.len(), 1);
    assert_eq!(config.news.windows[0].weekday, Some(chrono::Weekday::Thu));
    assert_eq!(config.news.major_lookahead_minutes, 30);
    assert!(config.news.enabled);
    assert_eq!(config.spread.forex_major, dec!(2.0));
    assert_eq!(config.spread.gold, dec!(5.0));

    std::env::set_var("SCHED__SCHEDULER__POOL_SIZE", "6");
    std::env::set_var("SCHED__SYMBOLS", "USDJPY,AUDUSD,NZDUSD");
    std::env::set_var("SCHED__DEDUP__ENABLED", "false");

    let overridden = tokio_test::assert_ok!(load_config(Some(&path_str)));

    std::env::remove_var("SCHED__SCHEDULER__POOL_SIZE");
    std::env::remove_var("SCHED__SYMBOLS");
    std::env::remove_var("SCHED__DEDUP__ENABLED");
    std::fs::remove_file(&path).ok();

    assert_eq!(overridden.scheduler.pool_size, 6);
    assert_eq!(overridden.symbols, vec!["USDJPY", "AUDUSD", "NZDUSD"]);
    assert!(!overridden.dedup.enabled);
    assert_eq!(overridden.account_currency, "EUR");
}

#[test]
fn test_invalid_file_is_configuration_error() {
    let path = write_config("invalid", "account_currency = \"XAU\"\n");
    let result = load_config(Some(&path.to_string_lossy()));
    std::fs::remove_file(&path).ok();

    let err = tokio_test::assert_err!(result);
    assert!(matches!(err, SchedulerError::Configuration(_)));
}

#[test]
fn test_snapshot_drops_disabled_strategies() {
    let path = write_config(
        "disabled",
        "active_strategies = [\"hft\", \"scalping\", \"hft\"]\n\n[strategies.hft]\nenabled = false\nlot_size = \"0.01\"\ntake_profit = \"3\"\nstop_loss = \"2\"\n",
    );
    let config = load_config(Some(&path.to_string_lossy())).unwrap();
    std::fs::remove_file(&path).ok();

    let snapshot = config.snapshot();
    assert_eq!(snapshot.active_strategies, vec![StrategyKind::Scalping]);
}
