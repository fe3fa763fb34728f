//! Rotation cadence — the closed set of supported periods.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DutyBotError;

const DAY_SECS: u64 = 24 * 60 * 60;
const WEEK_SECS: u64 = 7 * DAY_SECS;

/// How often the person on duty changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cadence {
    EverySecond,
    EveryMinute,
    EveryHour,
    #[default]
    EveryDay,
    EveryWeek,
    Every2Weeks,
    Every4Weeks,
}

impl Cadence {
    pub const ALL: [Cadence; 7] = [
        Cadence::EverySecond,
        Cadence::EveryMinute,
        Cadence::EveryHour,
        Cadence::EveryDay,
        Cadence::EveryWeek,
        Cadence::Every2Weeks,
        Cadence::Every4Weeks,
    ];

    /// Fixed length of one period.
    pub fn duration(&self) -> Duration {
        match self {
            Cadence::EverySecond => Duration::from_secs(1),
            Cadence::EveryMinute => Duration::from_secs(60),
            Cadence::EveryHour => Duration::from_secs(60 * 60),
            Cadence::EveryDay => Duration::from_secs(DAY_SECS),
            Cadence::EveryWeek => Duration::from_secs(WEEK_SECS),
            Cadence::Every2Weeks => Duration::from_secs(2 * WEEK_SECS),
            Cadence::Every4Weeks => Duration::from_secs(4 * WEEK_SECS),
        }
    }

    /// Same as [`Cadence::duration`], as a chrono duration for timestamp math.
    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.duration().as_secs() as i64)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::EverySecond => "every second",
            Cadence::EveryMinute => "every minute",
            Cadence::EveryHour => "every hour",
            Cadence::EveryDay => "every day",
            Cadence::EveryWeek => "every week",
            Cadence::Every2Weeks => "every 2 weeks",
            Cadence::Every4Weeks => "every 4 weeks",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cadence {
    type Err = DutyBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cadence::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| DutyBotError::UnsupportedCadence(s.to_string()))
    }
}

impl TryFrom<String> for Cadence {
    type Error = DutyBotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cadence> for String {
    fn from(value: Cadence) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all() {
        for cadence in Cadence::ALL {
            assert_eq!(cadence.as_str().parse::<Cadence>().unwrap(), cadence);
        }
    }

    #[test]
    fn test_unknown_period_rejected() {
        let err = "every fortnight".parse::<Cadence>().unwrap_err();
        assert!(matches!(err, DutyBotError::UnsupportedCadence(_)));
    }

    #[test]
    fn test_durations() {
        assert_eq!(Cadence::EverySecond.duration(), Duration::from_secs(1));
        assert_eq!(Cadence::EveryDay.duration(), Duration::from_secs(86_400));
        assert_eq!(Cadence::Every2Weeks.duration(), Duration::from_secs(14 * 86_400));
        assert_eq!(Cadence::Every4Weeks.as_chrono(), chrono::Duration::days(28));
    }

    #[test]
    fn test_default_is_daily() {
        assert_eq!(Cadence::default(), Cadence::EveryDay);
    }
}
