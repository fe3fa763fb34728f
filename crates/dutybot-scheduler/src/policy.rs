//! Rotation policy — decides whether to rotate and who is next.
//!
//! All mutable state sits behind one read-write lock per roster. The
//! scheduler's timer loop is the only writer during normal operation;
//! status queries only read.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};

use dutybot_calendar::WeekendFallback;
use dutybot_core::error::{DutyBotError, Result};
use dutybot_core::traits::{DayOffPolicy, VacationPolicy};
use dutybot_core::{Cadence, Checkpoint, HolderIndex, ProjectConfig, RotationEvent};

#[derive(Debug, Clone, Copy)]
struct RotationState {
    index: HolderIndex,
    last_change: DateTime<Utc>,
}

/// Rotation rules and state for one roster.
pub struct RotationPolicy {
    name: String,
    roster: Vec<String>,
    cadence: Cadence,
    skip_dayoffs: bool,
    day_offs: RwLock<Option<Arc<dyn DayOffPolicy>>>,
    vacations: RwLock<Option<Arc<dyn VacationPolicy>>>,
    state: RwLock<RotationState>,
}

impl RotationPolicy {
    /// Create a policy with a fresh state: nobody on duty, last change at the epoch.
    pub fn new(name: &str, roster: Vec<String>, cadence: Cadence) -> Result<Self> {
        if roster.is_empty() {
            return Err(DutyBotError::EmptyRoster(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            roster,
            cadence,
            skip_dayoffs: false,
            day_offs: RwLock::new(None),
            vacations: RwLock::new(None),
            state: RwLock::new(RotationState {
                index: HolderIndex::Uninitialized,
                last_change: DateTime::<Utc>::UNIX_EPOCH,
            }),
        })
    }

    pub fn from_config(config: &ProjectConfig) -> Result<Self> {
        Ok(Self::new(&config.name, config.applicants.clone(), config.period)?
            .skip_dayoffs(config.skip_dayoffs))
    }

    /// Hold rotations on non-working days.
    pub fn skip_dayoffs(mut self, skip: bool) -> Self {
        self.skip_dayoffs = skip;
        self
    }

    pub fn with_day_offs(self, policy: Arc<dyn DayOffPolicy>) -> Self {
        self.set_day_off_policy(Some(policy));
        self
    }

    pub fn with_vacations(self, policy: Arc<dyn VacationPolicy>) -> Self {
        self.set_vacation_policy(Some(policy));
        self
    }

    pub fn set_day_off_policy(&self, policy: Option<Arc<dyn DayOffPolicy>>) {
        *self.day_offs.write().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    pub fn set_vacation_policy(&self, policy: Option<Arc<dyn VacationPolicy>>) {
        *self.vacations.write().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    pub fn roster_id(&self) -> &str {
        &self.name
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Current person on duty, `None` before the first rotation.
    pub fn current_holder(&self) -> Option<String> {
        let state = self.read_state();
        state
            .index
            .position(self.roster.len())
            .map(|pos| self.roster[pos].clone())
    }

    pub fn last_change_time(&self) -> DateTime<Utc> {
        self.read_state().last_change
    }

    /// Snapshot of the durable part of the state.
    pub fn checkpoint(&self) -> Checkpoint {
        let state = self.read_state();
        Checkpoint::new(&self.name, state.index, state.last_change)
    }

    /// Whether the holder should change at `now`.
    pub fn should_advance(&self, now: DateTime<Utc>) -> bool {
        let last_change = self.last_change_time();

        // restarted, and it is not time yet
        if now.signed_duration_since(last_change) < self.cadence.as_chrono() {
            return false;
        }

        if self.skip_dayoffs && self.is_day_off(now) {
            return false;
        }

        true
    }

    /// Advance to the next available holder.
    ///
    /// Tries at most `roster.len()` candidates; if all of them are on
    /// vacation the index has made a full lap and `NoEligibleHolder` is returned.
    pub fn next_holder(&self, now: DateTime<Utc>) -> Result<String> {
        let mut state = self.write_state();
        self.advance_locked(&mut state, now)
    }

    pub fn set_last_change_time(&self, at: DateTime<Utc>) {
        self.write_state().last_change = at;
    }

    /// Record `now` as the change time and advance the holder in one step.
    ///
    /// The change time is recorded even when nobody is eligible, so the
    /// next attempt waits for a full cadence.
    pub fn rotate(&self, now: DateTime<Utc>) -> Result<RotationEvent> {
        let mut state = self.write_state();
        state.last_change = now;
        let holder = self.advance_locked(&mut state, now)?;
        Ok(RotationEvent {
            roster_id: self.name.clone(),
            holder,
            index: state.index.to_raw(),
        })
    }

    /// Time until the next cadence boundary measured from the last change.
    ///
    /// If the last change was several periods ago, whole periods are added
    /// until the result is non-negative, so the timer lands on a boundary
    /// instead of firing in a tight loop.
    ///
    /// A last change so far ahead that the boundary is not representable
    /// waits one period.
    pub fn time_until_next_evaluation(&self, now: DateTime<Utc>) -> Duration {
        let period = self.cadence.duration();
        let Some(next) = self
            .last_change_time()
            .checked_add_signed(self.cadence.as_chrono())
        else {
            tracing::warn!("⚠️ [{}] last change time is out of range", self.name);
            return period;
        };

        let delta = next.signed_duration_since(now);
        if let Ok(wait) = delta.to_std() {
            return wait;
        }

        let period = period.as_nanos() as i128;
        let late = -(delta.num_seconds() as i128 * 1_000_000_000 + delta.subsec_nanos() as i128);
        let behind = late % period;
        let nanos = if behind == 0 { 0 } else { period - behind };
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Replace the state with a persisted checkpoint of the same roster.
    pub fn restore_state(&self, checkpoint: &Checkpoint) -> Result<()> {
        if checkpoint.roster_id != self.name {
            return Err(DutyBotError::RosterMismatch {
                expected: self.name.clone(),
                found: checkpoint.roster_id.clone(),
            });
        }

        let mut state = self.write_state();
        state.index = checkpoint.index;
        state.last_change = checkpoint.last_change;
        Ok(())
    }

    fn advance_locked(&self, state: &mut RotationState, now: DateTime<Utc>) -> Result<String> {
        let vacations = self
            .vacations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let today = local_date(now);

        for _ in 0..self.roster.len() {
            state.index = state.index.advance(self.roster.len());
            let Some(pos) = state.index.position(self.roster.len()) else {
                continue;
            };
            let candidate = &self.roster[pos];

            if let Some(vacations) = &vacations {
                if self.is_unavailable(vacations.as_ref(), candidate, today) {
                    tracing::debug!("[{}] {} is on vacation, skipping", self.name, candidate);
                    continue;
                }
            }

            return Ok(candidate.clone());
        }

        Err(DutyBotError::NoEligibleHolder(self.name.clone()))
    }

    fn is_unavailable(&self, vacations: &dyn VacationPolicy, person: &str, date: NaiveDate) -> bool {
        vacations.is_unavailable(person, date).unwrap_or_else(|e| {
            tracing::warn!(
                "⚠️ [{}] could not check whether '{}' is on vacation ({}): {e}",
                self.name,
                person,
                vacations.name()
            );
            false
        })
    }

    fn is_day_off(&self, now: DateTime<Utc>) -> bool {
        let date = local_date(now);
        let day_offs = self
            .day_offs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(day_offs) = day_offs else {
            return is_weekend(date);
        };

        day_offs.is_non_working(date).unwrap_or_else(|e| {
            tracing::warn!(
                "⚠️ [{}] could not check if {} is a day off ({}): {e}; considering weekends only",
                self.name,
                date,
                day_offs.name()
            );
            is_weekend(date)
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RotationState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RotationState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Calendar date of `at` in the local time zone.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

fn is_weekend(date: NaiveDate) -> bool {
    WeekendFallback.is_non_working(date).unwrap_or(false)
}
