//! Line-oriented checkpoint format.
//!
//! ```text
//! <roster id>
//! <current index, decimal>
//! <last change, unix seconds>
//! ```
//! Stored as `<roster id>.state`.

use chrono::{DateTime, Utc};

use dutybot_core::error::{DutyBotError, Result};
use dutybot_core::{Cadence, Checkpoint, HolderIndex};

pub const STATE_FILE_SUFFIX: &str = ".state";

const FIELD_INDEX: &str = "current index";
const FIELD_LAST_CHANGE: &str = "last change";

/// Serialize a checkpoint. The timestamp is truncated to whole seconds.
pub fn encode(checkpoint: &Checkpoint) -> String {
    format!(
        "{}\n{}\n{}\n",
        checkpoint.roster_id,
        checkpoint.index.to_raw(),
        checkpoint.last_change.timestamp()
    )
}

/// Parse a checkpoint from the text format.
pub fn decode(text: &str) -> Result<Checkpoint> {
    let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

    let (Some(roster_id), Some(index), Some(last_change)) = (lines.next(), lines.next(), lines.next())
    else {
        return Err(DutyBotError::InsufficientRecord);
    };

    let index: u64 = index.trim().parse().map_err(|_| DutyBotError::MalformedField {
        field: FIELD_INDEX,
        value: index.to_string(),
    })?;

    let last_change = last_change
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .filter(|at| at.checked_add_signed(Cadence::Every4Weeks.as_chrono()).is_some())
        .ok_or_else(|| DutyBotError::MalformedField {
            field: FIELD_LAST_CHANGE,
            value: last_change.to_string(),
        })?;

    Ok(Checkpoint::new(roster_id, HolderIndex::from_raw(index), last_change))
}

pub fn is_state_file(file_name: &str) -> bool {
    file_name.len() > STATE_FILE_SUFFIX.len() && file_name.ends_with(STATE_FILE_SUFFIX)
}

pub fn state_file_name(roster_id: &str) -> String {
    format!("{roster_id}{STATE_FILE_SUFFIX}")
}
