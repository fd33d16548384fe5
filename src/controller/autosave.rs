//! Autosave state machine
//!
//! Persisting on every keystroke would flood the agent, so edits are
//! debounced; a save that is already in flight must never be doubled, so the
//! machine carries an explicit `Saving` state instead of a guard boolean.
//! Edits that land while a save is in flight set `dirty_again` and coalesce
//! into exactly one follow-up save when the response arrives.
//!
//! ```text
//! Idle --edit--> Pending --deadline--> Saving --response--> Idle
//!                  ^  |                  |
//!                  +--+ (edit re-arms)   +--edit--> dirty_again
//! ```
//!
//! The machine only tracks time; issuing the actual request, cloning the
//! snapshot, and merging the server reply are the worker's business.

use std::time::{Duration, Instant};

/// Where the autosave cycle currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveState {
    /// No unsaved changes
    Idle,
    /// Changes exist; the save fires once the deadline passes without
    /// further edits
    Pending { deadline: Instant },
    /// A save request is in flight; `dirty_again` records edits that
    /// arrived since its snapshot was taken
    Saving { dirty_again: bool },
}

impl AutosaveState {
    /// Record a content change at `now`
    ///
    /// Arms (or re-arms) the debounce deadline. While a save is in flight
    /// the edit is noted for the follow-up save instead.
    pub fn note_edit(&mut self, now: Instant, delay: Duration) {
        match self {
            AutosaveState::Saving { dirty_again } => *dirty_again = true,
            _ => *self = AutosaveState::Pending { deadline: now + delay },
        }
    }

    /// True when the debounce deadline has passed and a save should start
    pub fn due(&self, now: Instant) -> bool {
        matches!(self, AutosaveState::Pending { deadline } if *deadline <= now)
    }

    /// True while a save request is in flight
    pub fn is_saving(&self) -> bool {
        matches!(self, AutosaveState::Saving { .. })
    }

    /// Try to enter `Saving`; returns false when a save is already in
    /// flight (the one-save-at-a-time guard)
    pub fn begin_save(&mut self) -> bool {
        if self.is_saving() {
            return false;
        }
        *self = AutosaveState::Saving { dirty_again: false };
        true
    }

    /// Leave `Saving` when the response arrives; returns whether edits
    /// accumulated during the flight (the caller decides on a follow-up)
    pub fn finish_save(&mut self) -> bool {
        let dirty = matches!(self, AutosaveState::Saving { dirty_again: true });
        *self = AutosaveState::Idle;
        dirty
    }

    /// Drop any pending deadline and dirty flag, e.g. when a different
    /// pipeline takes over the working copy
    pub fn reset(&mut self) {
        *self = AutosaveState::Idle;
    }

    /// Time until the pending deadline, if one is armed
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        match self {
            AutosaveState::Pending { deadline } => {
                Some(deadline.saturating_duration_since(now))
            }
            _ => None,
        }
    }
}
