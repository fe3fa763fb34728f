//! # DutyBot Scheduler
//!
//! Duty rotation engine.
//! - [`policy`] — who is on duty and when the holder changes
//! - [`engine`] — per-roster timer loop and ordered shutdown
//! - [`notify`] — notifier pump and message rendering
//! - [`store`] — checkpoint stores (null, memory, file)
//! - [`checkpoint`] — on-disk checkpoint format

pub mod checkpoint;
pub mod engine;
pub mod notify;
pub mod policy;
pub mod store;

pub use engine::{Scheduler, SchedulerState};
pub use notify::render_message;
pub use policy::RotationPolicy;
pub use store::{FileStateStore, MemoryStateStore, NullStateStore, StateStore};
