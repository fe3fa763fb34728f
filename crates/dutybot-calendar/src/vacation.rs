//! Vacations listed in the config file.

use std::collections::HashMap;

use chrono::NaiveDate;

use dutybot_core::error::Result;
use dutybot_core::{VacationConfig, VacationEntry, VacationPolicy};

/// Inclusive date ranges per person.
#[derive(Debug, Default, Clone)]
pub struct VacationSchedule {
    ranges: HashMap<String, Vec<(NaiveDate, NaiveDate)>>,
}

impl VacationSchedule {
    pub fn new(entries: &[VacationEntry]) -> Self {
        let mut ranges: HashMap<String, Vec<(NaiveDate, NaiveDate)>> = HashMap::new();
        for entry in entries {
            ranges
                .entry(entry.person.trim().to_string())
                .or_default()
                .push((entry.start, entry.end));
        }
        Self { ranges }
    }

    pub fn from_config(config: &VacationConfig) -> Self {
        let schedule = Self::new(&config.entries);
        tracing::info!(
            "🏖️ vacation schedule: {} people, {} ranges",
            schedule.ranges.len(),
            config.entries.len()
        );
        schedule
    }
}

impl VacationPolicy for VacationSchedule {
    fn name(&self) -> &str {
        "schedule"
    }

    fn is_unavailable(&self, person: &str, date: NaiveDate) -> Result<bool> {
        Ok(self
            .ranges
            .get(person)
            .is_some_and(|ranges| ranges.iter().any(|(start, end)| *start <= date && date <= *end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn entry(person: &str, start: NaiveDate, end: NaiveDate) -> VacationEntry {
        VacationEntry {
            person: person.into(),
            start,
            end,
        }
    }

    #[test]
    fn test_ranges_are_inclusive() {
        let schedule = VacationSchedule::new(&[
            entry("alice", date(1, 10), date(1, 12)),
            entry("alice", date(3, 1), date(3, 1)),
        ]);

        assert!(!schedule.is_unavailable("alice", date(1, 9)).unwrap());
        assert!(schedule.is_unavailable("alice", date(1, 10)).unwrap());
        assert!(schedule.is_unavailable("alice", date(1, 12)).unwrap());
        assert!(!schedule.is_unavailable("alice", date(1, 13)).unwrap());
        assert!(schedule.is_unavailable("alice", date(3, 1)).unwrap());
    }

    #[test]
    fn test_unknown_person_is_available() {
        let schedule = VacationSchedule::new(&[entry("alice", date(1, 1), date(12, 31))]);
        assert!(!schedule.is_unavailable("bob", date(6, 1)).unwrap());
    }
}
