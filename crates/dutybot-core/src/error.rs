//! Unified error types for DutyBot.

use thiserror::Error;

/// Result type alias using DutyBotError.
pub type Result<T> = std::result::Result<T, DutyBotError>;

#[derive(Error, Debug)]
pub enum DutyBotError {
    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Roster of project '{0}' must not be empty")]
    EmptyRoster(String),

    #[error("Unsupported period: '{0}'")]
    UnsupportedCadence(String),

    #[error("Unsupported notify channel: '{0}'")]
    UnsupportedChannel(String),

    #[error("Unsupported vacation type: '{0}'")]
    UnsupportedVacationType(String),

    // Rotation errors
    #[error("Roster mismatch: expected '{expected}', found '{found}'")]
    RosterMismatch { expected: String, found: String },

    #[error("No eligible holder in project '{0}': everyone is unavailable")]
    NoEligibleHolder(String),

    // Persistence errors
    #[error("State not found: {0}")]
    NotFound(String),

    #[error("Insufficient state record: expected 3 lines")]
    InsufficientRecord,

    #[error("Malformed state field '{field}': '{value}'")]
    MalformedField { field: &'static str, value: String },

    #[error("Queue is full: {0}")]
    QueueFull(String),

    // Delivery and provider errors
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl DutyBotError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn calendar(msg: impl Into<String>) -> Self {
        Self::Calendar(msg.into())
    }

    /// Whether this error means "no record", as opposed to a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
