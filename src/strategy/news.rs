//! High-impact news blackout windows
//!
//! Windows are UTC wall-clock ranges, end inclusive at minute resolution,
//! applying every day or on one weekday. Callers pass `now` in; nothing here
//! reads the clock.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::strategy::types::StrategyKind;

/// Currencies whose pairs also honour the major-news lookahead
const MAJOR_CURRENCIES: [&str; 3] = ["USD", "EUR", "GBP"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Only on this day when set
    #[serde(default)]
    pub weekday: Option<Weekday>,
    #[serde(default)]
    pub label: Option<String>,
}

impl NewsWindow {
    fn daily(start: (u32, u32), end: (u32, u32), label: &str) -> Self {
        Self {
            start: hm(start),
            end: hm(end),
            weekday: None,
            label: Some(label.to_string()),
        }
    }

    fn weekly(day: Weekday, start: (u32, u32), end: (u32, u32), label: &str) -> Self {
        Self {
            weekday: Some(day),
            ..Self::daily(start, end, label)
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if self.weekday.is_some_and(|day| day != now.weekday()) {
            return false;
        }
        let minute = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now.time());
        if self.start <= self.end {
            self.start <= minute && minute <= self.end
        } else {
            minute >= self.start || minute <= self.end
        }
    }

    fn describe(&self) -> String {
        let span = format!("{}-{} UTC", self.start.format("%H:%M"), self.end.format("%H:%M"));
        match &self.label {
            Some(label) => format!("{} ({})", label, span),
            None => span,
        }
    }
}

fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

/// News calendar and how far ahead of a window trading stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    pub enabled: bool,
    pub windows: Vec<NewsWindow>,
    /// HFT stops this long before any window opens; 0 disables
    pub hft_lookahead_minutes: i64,
    /// USD/EUR/GBP pairs stop this long before any window opens; 0 disables
    pub major_lookahead_minutes: i64,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            windows: vec![
                NewsWindow::daily((8, 30), (9, 30), "European releases"),
                NewsWindow::daily((12, 30), (14, 30), "US releases"),
                NewsWindow::daily((16, 0), (16, 30), "London fix"),
                NewsWindow::weekly(Weekday::Wed, (13, 0), (14, 0), "FOMC minutes"),
                NewsWindow::weekly(Weekday::Fri, (12, 30), (15, 0), "Non-farm payrolls"),
            ],
            hft_lookahead_minutes: 0,
            major_lookahead_minutes: 0,
        }
    }
}

impl NewsSettings {
    /// The window `now` falls in, if any
    pub fn active_window(&self, now: DateTime<Utc>) -> Option<&NewsWindow> {
        self.windows.iter().find(|w| w.contains(now))
    }

    /// Window openings in `[now, now + horizon]`, earliest first
    pub fn upcoming(&self, now: DateTime<Utc>, horizon: Duration) -> Vec<DateTime<Utc>> {
        let until = now + horizon;
        let days = horizon.num_days().max(0) + 1;
        let mut starts: Vec<DateTime<Utc>> = (0..=days)
            .map(|offset| (now + Duration::days(offset)).date_naive())
            .flat_map(|date| {
                self.windows
                    .iter()
                    .filter(move |w| w.weekday.map_or(true, |day| day == date.weekday()))
                    .map(move |w| date.and_time(w.start).and_utc())
            })
            .filter(|start| *start >= now && *start <= until)
            .collect();
        starts.sort();
        starts.dedup();
        starts
    }

    /// Why `strategy` on `symbol` must not trade at `now`, if it must not
    pub fn blackout(&self, symbol: &str, strategy: StrategyKind, now: DateTime<Utc>) -> Option<String> {
        if !self.enabled {
            return None;
        }
        if let Some(window) = self.active_window(now) {
            return Some(format!("news window {}", window.describe()));
        }
        if strategy == StrategyKind::Hft && self.hft_lookahead_minutes > 0 {
            let horizon = Duration::minutes(self.hft_lookahead_minutes);
            if let Some(next) = self.upcoming(now, horizon).first() {
                return Some(format!("news at {} inside the HFT lookahead", next.format("%H:%M")));
            }
        }
        let symbol = symbol.to_ascii_uppercase();
        if self.major_lookahead_minutes > 0 && MAJOR_CURRENCIES.iter().any(|c| symbol.contains(c)) {
            let horizon = Duration::minutes(self.major_lookahead_minutes);
            if let Some(next) = self.upcoming(now, horizon).first() {
                return Some(format!("major-currency news at {}", next.format("%H:%M")));
            }
        }
        None
    }
}
