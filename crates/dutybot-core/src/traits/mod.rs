//! Capability traits implemented by the pluggable backends.

pub mod calendar;
pub mod notify;

pub use calendar::{DayOffPolicy, VacationPolicy};
pub use notify::NotifyChannel;
