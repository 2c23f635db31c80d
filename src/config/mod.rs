//! Configuration: file + environment loading and the per-cycle snapshot

pub mod loader;
pub mod types;

pub use loader::{load_config, StaticConfigSource};
pub use types::{AppConfig, ConfigSnapshot, SchedulerSettings, StrategySettings, StrategyTable};
