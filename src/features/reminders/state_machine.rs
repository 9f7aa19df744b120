//! # Reminder State Machine
//!
//! The two per-contact transitions. `refresh` absorbs a newly observed
//! conversation; `evaluate` decides whether a reminder is due and advances the
//! schedule. Both are no-ops when there is nothing to do, leaving the state
//! clean so no write happens.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Counter reset on new contact behind an explicit config switch
//! - 1.0.0: Initial release

use log::debug;

use super::scheduler::ReminderScheduler;
use super::state::ContactState;

pub struct ReminderStateMachine {
    scheduler: ReminderScheduler,
    reset_count_on_contact: bool,
}

impl ReminderStateMachine {
    pub fn new(scheduler: ReminderScheduler, reset_count_on_contact: bool) -> Self {
        ReminderStateMachine {
            scheduler,
            reset_count_on_contact,
        }
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    /// Absorb a newly observed conversation. Anything at or before the known
    /// last contact leaves the state untouched.
    ///
    /// The reminder counter carries across contact episodes unless
    /// `reset_count_on_contact` is set; see the configuration docs.
    pub fn refresh(&self, state: &mut ContactState, observed: Option<i64>, now: i64) {
        let Some(observed) = observed else { return };
        if observed <= state.last_contact {
            return;
        }

        debug!("More recent conversation found at {observed}");
        state.last_contact = observed;
        if self.reset_count_on_contact {
            state.times_reminded = 0;
        }
        state.next_reminder =
            self.scheduler
                .next_reminder_time(now, observed, state.times_reminded);
        state.dirty = true;
    }

    /// Decide whether a reminder is due. When it is, the counter and the next
    /// due time advance before the caller learns about it; the caller persists
    /// the state and only then delivers, so a delivery failure costs one
    /// missed reminder rather than a duplicate.
    pub fn evaluate(&self, state: &mut ContactState, now: i64) -> bool {
        if now <= state.next_reminder {
            return false;
        }

        state.times_reminded += 1;
        state.next_reminder =
            self.scheduler
                .next_reminder_time(now, state.last_contact, state.times_reminded);
        state.dirty = true;
        debug!(
            "Reminder {} due, next at {}",
            state.times_reminded, state.next_reminder
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::state::StoredState;

    const NOW: i64 = 1_760_000_000_000;

    fn machine(reset: bool) -> ReminderStateMachine {
        ReminderStateMachine::new(ReminderScheduler::new(90, 1.3), reset)
    }

    fn clean_state(last_contact: i64, times_reminded: u32, next_reminder: i64) -> ContactState {
        ContactState::from_stored(
            Some(StoredState {
                last_contact: Some(last_contact),
                times_reminded: Some(times_reminded),
                next_reminder: Some(next_reminder),
            }),
            machine(false).scheduler(),
            NOW,
        )
    }

    #[test]
    fn refresh_ignores_older_conversations() {
        let mut state = clean_state(1000, 2, NOW + 1000);
        let before = state.clone();

        machine(false).refresh(&mut state, Some(500), NOW);
        assert_eq!(state, before);
        assert!(!state.dirty);

        machine(false).refresh(&mut state, Some(1000), NOW);
        assert_eq!(state, before);
        assert!(!state.dirty);
    }

    #[test]
    fn refresh_without_observation_is_a_no_op() {
        let mut state = clean_state(1000, 2, NOW + 1000);
        let before = state.clone();

        machine(false).refresh(&mut state, None, NOW);
        assert_eq!(state, before);
    }

    #[test]
    fn refresh_advances_on_newer_conversation() {
        let mut state = clean_state(1000, 2, NOW - 5000);
        let observed = NOW - 10_000;

        machine(false).refresh(&mut state, Some(observed), NOW);
        assert!(state.dirty);
        assert_eq!(state.last_contact, observed);
        // Counter carries across contact episodes by default.
        assert_eq!(state.times_reminded, 2);
        assert!(state.next_reminder > NOW);
    }

    #[test]
    fn refresh_can_reset_the_counter() {
        let mut state = clean_state(1000, 4, NOW - 5000);

        machine(true).refresh(&mut state, Some(NOW - 10_000), NOW);
        assert!(state.dirty);
        assert_eq!(state.times_reminded, 0);
    }

    #[test]
    fn evaluate_before_due_time_changes_nothing() {
        let mut state = clean_state(1000, 1, NOW + 1);
        let before = state.clone();

        assert!(!machine(false).evaluate(&mut state, NOW));
        assert_eq!(state, before);
        assert!(!state.dirty);

        // Exactly at the due time is still not due.
        assert!(!machine(false).evaluate(&mut state, NOW + 1));
        assert_eq!(state, before);
    }

    #[test]
    fn evaluate_past_due_time_advances_the_schedule() {
        let previous_due = NOW - 1;
        let mut state = clean_state(1000, 1, previous_due);

        assert!(machine(false).evaluate(&mut state, NOW));
        assert!(state.dirty);
        assert_eq!(state.times_reminded, 2);
        assert!(state.next_reminder > previous_due);
        assert_eq!(state.last_contact, 1000);
    }
}
