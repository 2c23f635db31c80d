//! Unified types shared by the pipeline stages and collaborators

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// The opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Bar timeframe requested from the market data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
}

impl Timeframe {
    pub fn seconds(self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::H1 => 3600,
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::M1
    }
}

/// Which protective level a risk parameter describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    TakeProfit,
    StopLoss,
}

impl LevelKind {
    /// Sign of the offset from entry: +1 above, -1 below
    pub fn side_sign(self, direction: Direction) -> Decimal {
        match (self, direction) {
            (LevelKind::TakeProfit, Direction::Buy) | (LevelKind::StopLoss, Direction::Sell) => {
                Decimal::ONE
            }
            (LevelKind::TakeProfit, Direction::Sell) | (LevelKind::StopLoss, Direction::Buy) => {
                Decimal::NEGATIVE_ONE
            }
        }
    }
}

impl std::fmt::Display for LevelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelKind::TakeProfit => write!(f, "TP"),
            LevelKind::StopLoss => write!(f, "SL"),
        }
    }
}

/// One OHLC bar. Volume is optional and synthesized downstream when absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// High minus low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Best bid/ask quote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Tick {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self { bid, ask }
    }

    /// Price an order in `direction` would fill at
    pub fn entry_price(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::Buy => self.ask,
            Direction::Sell => self.bid,
        }
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / dec!(2)
    }

    pub fn mid_f64(&self) -> f64 {
        self.mid().to_f64().unwrap_or(0.0)
    }
}

/// Per-symbol trading metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMeta {
    pub symbol: String,
    /// Smallest price increment; used as the pip size
    pub point: Decimal,
    /// Digit precision prices are rounded to
    pub digits: u32,
    /// Broker stop level in points
    #[serde(default)]
    pub stops_level: u32,
    /// Current spread in points
    #[serde(default)]
    pub spread: u32,
    #[serde(default = "default_contract_size")]
    pub contract_size: Decimal,
    /// Account-currency value of one tick for one lot
    #[serde(default)]
    pub tick_value: Decimal,
    #[serde(default)]
    pub tick_size: Decimal,
    #[serde(default = "default_volume_min")]
    pub volume_min: Decimal,
    #[serde(default = "default_volume_max")]
    pub volume_max: Decimal,
    #[serde(default = "default_volume_min")]
    pub volume_step: Decimal,
}

fn default_contract_size() -> Decimal {
    dec!(100000)
}

fn default_volume_min() -> Decimal {
    dec!(0.01)
}

fn default_volume_max() -> Decimal {
    dec!(100)
}

impl InstrumentMeta {
    /// FX major defaults quoted to the pip: four digits, ten account units
    /// per pip per standard lot
    pub fn forex(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            point: dec!(0.0001),
            digits: 4,
            stops_level: 10,
            spread: 2,
            contract_size: default_contract_size(),
            tick_value: dec!(10),
            tick_size: dec!(0.0001),
            volume_min: default_volume_min(),
            volume_max: default_volume_max(),
            volume_step: default_volume_min(),
        }
    }

    /// Requote to `point`; the tick follows so the pip value is unchanged
    pub fn with_point(mut self, point: Decimal, digits: u32) -> Self {
        self.point = point;
        self.digits = digits;
        self.tick_size = point;
        self
    }

    pub fn with_stops(mut self, stops_level: u32, spread: u32) -> Self {
        self.stops_level = stops_level;
        self.spread = spread;
        self
    }

    /// Broker minimum gap between entry and a protective level
    pub fn min_stop_distance(&self) -> Decimal {
        let stops = Decimal::from(self.stops_level) * self.point;
        let spread = Decimal::from(self.spread) * self.point * dec!(2);
        stops.max(spread)
    }
}

/// Fully validated, ready-to-submit order description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: String,
    pub direction: Direction,
    pub lot_size: Decimal,
    pub entry_price: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
    pub strategy: StrategyKind,
    pub quality_score: u32,
    /// Rationale tags of the agreeing signals
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderIntent {
    /// Reward-to-risk ratio of the resolved levels
    pub fn risk_reward(&self) -> Option<Decimal> {
        crate::risk::risk_reward(self.entry_price, self.take_profit, self.stop_loss)
    }
}
