use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::common::types::Direction;
use crate::strategy::types::StrategyKind;

/// Deduplication tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Identical signals inside this window are duplicates
    #[serde(default = "default_min_interval")]
    pub min_interval_seconds: i64,
    /// Cap on accepted signals per symbol over the last minute
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: usize,
    /// Records older than this are forgotten
    #[serde(default = "default_retention")]
    pub retention_seconds: i64,
    /// Look-back for the similarity check
    #[serde(default = "default_similarity_window")]
    pub similarity_window_seconds: i64,
    /// Jaccard similarity of tag sets at or above which signals are duplicates
    #[serde(default = "default_similarity")]
    pub similarity_threshold: f64,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            min_interval_seconds: default_min_interval(),
            max_per_minute: default_max_per_minute(),
            retention_seconds: default_retention(),
            similarity_window_seconds: default_similarity_window(),
            similarity_threshold: default_similarity(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_min_interval() -> i64 {
    30
}

fn default_max_per_minute() -> usize {
    5
}

fn default_retention() -> i64 {
    300
}

fn default_similarity_window() -> i64 {
    120
}

fn default_similarity() -> f64 {
    0.8
}

/// What a candidate intent is compared on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub direction: Direction,
    pub tags: BTreeSet<String>,
}

impl SignalKey {
    pub fn new(
        symbol: impl Into<String>,
        strategy: StrategyKind,
        direction: Direction,
        tags: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            strategy,
            direction,
            tags: tags.into_iter().collect(),
        }
    }
}

/// Why a candidate was suppressed
#[derive(Debug, Clone, PartialEq)]
pub enum DedupVerdict {
    Unique,
    Repeated,
    RateLimited { recent: usize },
    Similar { similarity: f64 },
}

impl DedupVerdict {
    pub fn is_unique(&self) -> bool {
        matches!(self, DedupVerdict::Unique)
    }
}

#[derive(Debug, Clone)]
struct Record {
    key: SignalKey,
    at: DateTime<Utc>,
}

/// Suppresses repeated, too-frequent, or near-identical signals per symbol.
///
/// Time is always passed in so behavior is deterministic under test.
#[derive(Debug, Default)]
pub struct SignalDeduplicator {
    settings: DedupSettings,
    by_symbol: HashMap<String, Vec<Record>>,
}

impl SignalDeduplicator {
    pub fn new(settings: DedupSettings) -> Self {
        Self {
            settings,
            by_symbol: HashMap::new(),
        }
    }

    /// Check `key` at `now` and record it when unique
    pub fn check(&mut self, key: &SignalKey, now: DateTime<Utc>) -> DedupVerdict {
        if !self.settings.enabled {
            return DedupVerdict::Unique;
        }
        self.evict(now);

        let records = self.by_symbol.entry(key.symbol.clone()).or_default();
        let min_interval = Duration::seconds(self.settings.min_interval_seconds);
        if records
            .iter()
            .any(|r| r.key == *key && now - r.at < min_interval)
        {
            return DedupVerdict::Repeated;
        }

        let recent = records
            .iter()
            .filter(|r| now - r.at <= Duration::seconds(60))
            .count();
        if recent >= self.settings.max_per_minute {
            return DedupVerdict::RateLimited { recent };
        }

        let window = Duration::seconds(self.settings.similarity_window_seconds);
        let similar = records
            .iter()
            .filter(|r| now - r.at <= window)
            .filter(|r| r.key.strategy == key.strategy && r.key.direction == key.direction)
            .map(|r| jaccard(&r.key.tags, &key.tags))
            .find(|s| *s >= self.settings.similarity_threshold);
        if let Some(similarity) = similar {
            return DedupVerdict::Similar { similarity };
        }

        records.push(Record {
            key: key.clone(),
            at: now,
        });
        DedupVerdict::Unique
    }

    /// Number of remembered signals across all symbols
    pub fn tracked(&self) -> usize {
        self.by_symbol.values().map(Vec::len).sum()
    }

    fn evict(&mut self, now: DateTime<Utc>) {
        let retention = Duration::seconds(self.settings.retention_seconds);
        for records in self.by_symbol.values_mut() {
            records.retain(|r| now - r.at <= retention);
        }
        self.by_symbol.retain(|_, records| !records.is_empty());
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}
