//! Trading sessions and their lot/TP/SL multipliers

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Market session by UTC time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingSession {
    Asia,
    London,
    NewYork,
    OverlapLondonNy,
}

/// Multipliers applied to a strategy's base parameters during a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionMultipliers {
    pub lot: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

impl TradingSession {
    /// (start, end) in minutes after midnight UTC, end inclusive
    fn window(self) -> (u32, u32) {
        match self {
            TradingSession::Asia => (21 * 60, 6 * 60),
            TradingSession::London => (7 * 60, 15 * 60),
            TradingSession::NewYork => (15 * 60, 21 * 60),
            TradingSession::OverlapLondonNy => (15 * 60, 17 * 60),
        }
    }

    fn contains(self, minute_of_day: u32) -> bool {
        let (start, end) = self.window();
        if start > end {
            minute_of_day >= start || minute_of_day <= end
        } else {
            (start..=end).contains(&minute_of_day)
        }
    }

    pub fn multipliers(self) -> SessionMultipliers {
        let (lot, take_profit, stop_loss) = match self {
            TradingSession::Asia => (dec!(0.8), dec!(1.0), dec!(1.2)),
            TradingSession::London => (dec!(1.0), dec!(1.0), dec!(1.0)),
            TradingSession::NewYork => (dec!(1.2), dec!(1.1), dec!(0.9)),
            TradingSession::OverlapLondonNy => (dec!(1.5), dec!(1.2), dec!(0.8)),
        };
        SessionMultipliers {
            lot,
            take_profit,
            stop_loss,
        }
    }
}

/// The session in force at `now`. The London/New York overlap wins over
/// New York; times matching nothing fall back to London.
pub fn session_at(now: DateTime<Utc>) -> TradingSession {
    let minute = now.hour() * 60 + now.minute();
    [
        TradingSession::OverlapLondonNy,
        TradingSession::Asia,
        TradingSession::London,
        TradingSession::NewYork,
    ]
    .into_iter()
    .find(|session| session.contains(minute))
    .unwrap_or(TradingSession::London)
}

impl std::fmt::Display for TradingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TradingSession::Asia => "asia",
            TradingSession::London => "london",
            TradingSession::NewYork => "new_york",
            TradingSession::OverlapLondonNy => "overlap_london_ny",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_session_selection() {
        assert_eq!(session_at(at(2, 0)), TradingSession::Asia);
        assert_eq!(session_at(at(22, 30)), TradingSession::Asia);
        assert_eq!(session_at(at(9, 0)), TradingSession::London);
        assert_eq!(session_at(at(16, 0)), TradingSession::OverlapLondonNy);
        assert_eq!(session_at(at(19, 0)), TradingSession::NewYork);
    }

    #[test]
    fn test_gap_defaults_to_london() {
        // 06:30 falls between Asia close and London open
        assert_eq!(session_at(at(6, 30)), TradingSession::London);
    }

    #[test]
    fn test_multipliers() {
        let m = TradingSession::OverlapLondonNy.multipliers();
        assert_eq!(m.lot, dec!(1.5));
        assert_eq!(TradingSession::Asia.multipliers().stop_loss, dec!(1.2));
    }
}
