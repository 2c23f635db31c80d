//! Configuration loader

use async_trait::async_trait;
use config::{Config, Environment, File};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::info;

use super::types::{AppConfig, ConfigSnapshot};
use crate::common::errors::{Result, SchedulerError};
use crate::common::traits::ConfigSource;

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with SCHED__, e.g. `SCHED__SCHEDULER__POOL_SIZE=4`)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("SCHED")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("symbols")
            .with_list_parse_key("active_strategies")
            .try_parsing(true),
    );

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// [`ConfigSource`] over an in-process config that can be swapped between cycles
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    inner: Arc<RwLock<AppConfig>>,
}

impl StaticConfigSource {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Replace the configuration. Tasks already dispatched keep the
    /// snapshot they were given.
    pub fn update(&self, config: AppConfig) -> Result<()> {
        config.validate()?;
        let mut guard = self
            .inner
            .write()
            .map_err(|_| SchedulerError::Internal("config lock poisoned".to_string()))?;
        *guard = config;
        info!("Configuration updated");
        Ok(())
    }

    /// Edit the configuration in place
    pub fn modify(&self, f: impl FnOnce(&mut AppConfig)) -> Result<()> {
        let mut next = self.current()?;
        f(&mut next);
        self.update(next)
    }

    pub fn current(&self) -> Result<AppConfig> {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| SchedulerError::Internal("config lock poisoned".to_string()))
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn snapshot(&self) -> Result<ConfigSnapshot> {
        Ok(self.current()?.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Some("does-not-exist.toml")).unwrap();
        assert_eq!(config.account_currency, "USD");
        assert_eq!(config.symbols.len(), 4);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let source = StaticConfigSource::new(AppConfig::default());
        let before = source.snapshot().await.unwrap();
        source
            .modify(|c| c.strategies.scalping.lot_size = dec!(0.5))
            .unwrap();
        assert_eq!(before.strategy(StrategyKind::Scalping).lot_size, dec!(0.05));
        let after = source.snapshot().await.unwrap();
        assert_eq!(after.strategy(StrategyKind::Scalping).lot_size, dec!(0.5));
    }

    #[test]
    fn test_invalid_update_is_refused() {
        let source = StaticConfigSource::new(AppConfig::default());
        let result = source.modify(|c| c.scheduler.pool_size = 0);
        assert!(result.is_err());
        assert_eq!(source.current().unwrap().scheduler.pool_size, 2);
    }
}
