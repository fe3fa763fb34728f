//! Shared rotation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of the current holder in the roster.
///
/// `Uninitialized` is the state before the first rotation; advancing it lands
/// on the first person of the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HolderIndex {
    #[default]
    Uninitialized,
    At(u64),
}

impl HolderIndex {
    /// Raw value used on disk for `Uninitialized`.
    pub const UNINITIALIZED_RAW: u64 = u64::MAX;

    /// The index after one rotation in a roster of `len` people.
    ///
    /// Near the sentinel the index is reduced modulo `len` first, so the
    /// position still moves one step forward.
    pub fn advance(self, len: usize) -> Self {
        match self {
            HolderIndex::Uninitialized => HolderIndex::At(0),
            HolderIndex::At(i) => match i.checked_add(1) {
                Some(next) if next != Self::UNINITIALIZED_RAW => HolderIndex::At(next),
                _ => match len as u64 {
                    0 => HolderIndex::At(0),
                    len => HolderIndex::At((i % len + 1) % len),
                },
            },
        }
    }

    /// Roster position for a roster of `len` people, `None` before the first rotation.
    pub fn position(self, len: usize) -> Option<usize> {
        match self {
            HolderIndex::Uninitialized => None,
            HolderIndex::At(_) if len == 0 => None,
            HolderIndex::At(i) => Some((i % len as u64) as usize),
        }
    }

    pub fn to_raw(self) -> u64 {
        match self {
            HolderIndex::Uninitialized => Self::UNINITIALIZED_RAW,
            HolderIndex::At(i) => i,
        }
    }

    pub fn from_raw(raw: u64) -> Self {
        if raw == Self::UNINITIALIZED_RAW {
            HolderIndex::Uninitialized
        } else {
            HolderIndex::At(raw)
        }
    }
}

/// Durable rotation state of one roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub roster_id: String,
    pub index: HolderIndex,
    pub last_change: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(roster_id: impl Into<String>, index: HolderIndex, last_change: DateTime<Utc>) -> Self {
        Self {
            roster_id: roster_id.into(),
            index,
            last_change,
        }
    }
}

/// A new holder has been selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationEvent {
    pub roster_id: String,
    pub holder: String,
    /// Raw holder index after the rotation.
    pub index: u64,
}
