//! Market structure and the Quality Scorer
//!
//! - [`analyze`]: bias, confidence, momentum and level context
//! - [`enhancement_signals`]: structure-aligned signals appended before scoring
//! - [`QualityScorer`]: the 0-100 score and final direction

pub mod enhance;
pub mod quality;
pub mod structure;

pub use enhance::enhancement_signals;
pub use quality::{confluence_points, Evaluation, QualityScore, QualityScorer, ScoreComponent};
pub use structure::{analyze, Bias, MarketStructure, Volatility};
