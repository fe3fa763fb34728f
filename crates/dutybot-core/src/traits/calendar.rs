//! Day-off and vacation predicates consulted by the rotation policy.
//!
//! Both are synchronous: implementations answer from local state
//! (a cache or a configured schedule) and refresh it elsewhere.

use chrono::NaiveDate;

use crate::error::Result;

/// Decides whether a date is a non-working day (holiday or weekend).
pub trait DayOffPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn is_non_working(&self, date: NaiveDate) -> Result<bool>;
}

/// Decides whether a person cannot be on duty on a date.
pub trait VacationPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn is_unavailable(&self, person: &str, date: NaiveDate) -> Result<bool>;
}
