//! # DutyBot Core
//!
//! Shared building blocks for the duty rotation bot:
//! - [`error`] — the crate-wide error enum
//! - [`config`] — TOML configuration and validation
//! - [`cadence`] — supported rotation periods
//! - [`types`] — checkpoints, holder indices and rotation events
//! - [`traits`] — notify channel and calendar capabilities

pub mod cadence;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use cadence::Cadence;
pub use config::{
    ChannelType, DutyBotConfig, MyTeamConfig, ProductionCalConfig, ProjectConfig, VacationConfig,
    VacationEntry, VacationType,
};
pub use error::{DutyBotError, Result};
pub use traits::{DayOffPolicy, NotifyChannel, VacationPolicy};
pub use types::{Checkpoint, HolderIndex, RotationEvent};
