//! # DutyBot Calendar
//! Answers "is this a day off?" and "is this person away?" for the rotation policy.
//!
//! - [`WeekendFallback`] — Saturday and Sunday are days off
//! - [`ProductionCalendar`] — holidays from isdayoff.ru, cached and refetched periodically
//! - [`VacationSchedule`] — vacations listed in the config file

pub mod production;
pub mod vacation;
pub mod weekend;

pub use production::ProductionCalendar;
pub use vacation::VacationSchedule;
pub use weekend::WeekendFallback;
