use chrono::{Datelike, NaiveDate, Weekday};

use dutybot_core::DayOffPolicy;
use dutybot_core::error::Result;

/// Day-off policy used when no production calendar is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeekendFallback;

impl DayOffPolicy for WeekendFallback {
    fn name(&self) -> &str {
        "weekend"
    }

    fn is_non_working(&self, date: NaiveDate) -> Result<bool> {
        Ok(matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekends() {
        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        assert!(!WeekendFallback.is_non_working(date(12)).unwrap()); // Fri
        assert!(WeekendFallback.is_non_working(date(13)).unwrap());
        assert!(WeekendFallback.is_non_working(date(14)).unwrap());
        assert!(!WeekendFallback.is_non_working(date(15)).unwrap()); // Mon
    }
}
