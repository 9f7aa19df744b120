//! # Contact Reminder State
//!
//! The per-contact state blob and its defaulting rules. The blob is stored as
//! JSON in a single opaque contact field with the keys `lastContact`,
//! `timesReminded` and `nextReminder`; anything missing or unreadable is
//! defaulted rather than treated as an error.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use log::debug;
use serde::{Deserialize, Serialize};

use super::scheduler::ReminderScheduler;

/// Wire form of the persisted blob. Every field is optional so a partially
/// valid blob can be defaulted field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times_reminded: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_reminder: Option<i64>,
}

impl StoredState {
    /// Parse a raw field value. Malformed content maps to `None` so that
    /// corruption and absence take the same defaulting path.
    pub fn parse(raw: &str) -> Option<StoredState> {
        match serde_json::from_str(raw) {
            Ok(state) => Some(state),
            Err(err) => {
                debug!("Unparsable reminder state ({err}), using defaults");
                None
            }
        }
    }
}

/// In-memory reminder state for one contact during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactState {
    /// Most recent known conversation, epoch milliseconds. 0 when never
    /// observed.
    pub last_contact: i64,
    /// Reminders sent since `last_contact` last advanced.
    pub times_reminded: u32,
    /// When the next reminder becomes due.
    pub next_reminder: i64,
    /// True when memory differs from the stored blob. Never persisted.
    pub dirty: bool,
}

impl ContactState {
    /// Build state from whatever was stored, defaulting each missing field.
    /// A defaulted field marks the state dirty so the defaults get written
    /// back. A missing schedule is seeded with a first reminder time; a last
    /// contact of 0 counts as no history there.
    pub fn from_stored(
        stored: Option<StoredState>,
        scheduler: &ReminderScheduler,
        now: i64,
    ) -> ContactState {
        let stored = stored.unwrap_or_default();
        let mut dirty = false;

        let last_contact = stored.last_contact.unwrap_or_else(|| {
            dirty = true;
            0
        });
        let times_reminded = stored.times_reminded.unwrap_or_else(|| {
            dirty = true;
            0
        });
        let next_reminder = stored.next_reminder.unwrap_or_else(|| {
            dirty = true;
            scheduler.first_reminder_time(now, (last_contact > 0).then_some(last_contact))
        });

        ContactState {
            last_contact,
            times_reminded,
            next_reminder,
            dirty,
        }
    }

    fn to_stored(&self) -> StoredState {
        StoredState {
            last_contact: Some(self.last_contact),
            times_reminded: Some(self.times_reminded),
            next_reminder: Some(self.next_reminder),
        }
    }

    /// Serialize for storage. The dirty flag stays out of the blob.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_stored())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> ReminderScheduler {
        ReminderScheduler::new(90, 1.3)
    }

    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn parse_accepts_stored_wire_format() {
        let stored =
            StoredState::parse(r#"{"lastContact":1000,"timesReminded":2,"nextReminder":5000}"#)
                .unwrap();
        assert_eq!(stored.last_contact, Some(1000));
        assert_eq!(stored.times_reminded, Some(2));
        assert_eq!(stored.next_reminder, Some(5000));
    }

    #[test]
    fn parse_maps_garbage_to_none() {
        assert_eq!(StoredState::parse("not json"), None);
        assert_eq!(StoredState::parse(r#"{"lastContact":"soon"}"#), None);
    }

    #[test]
    fn missing_blob_defaults_every_field() {
        let state = ContactState::from_stored(None, &scheduler(), NOW);
        assert!(state.dirty);
        assert_eq!(state.last_contact, 0);
        assert_eq!(state.times_reminded, 0);
        // No history: first reminder lands within one interval of now.
        assert!(state.next_reminder >= NOW);
    }

    #[test]
    fn partial_blob_defaults_only_missing_fields() {
        let stored = StoredState::parse(r#"{"lastContact":1000}"#).unwrap();
        let state = ContactState::from_stored(Some(stored), &scheduler(), NOW);
        assert!(state.dirty);
        assert_eq!(state.last_contact, 1000);
        assert_eq!(state.times_reminded, 0);
        assert!(state.next_reminder > 0);
    }

    #[test]
    fn complete_blob_loads_clean() {
        let stored = StoredState {
            last_contact: Some(1000),
            times_reminded: Some(3),
            next_reminder: Some(NOW + 1),
        };
        let state = ContactState::from_stored(Some(stored), &scheduler(), NOW);
        assert!(!state.dirty);
        assert_eq!(state.last_contact, 1000);
        assert_eq!(state.times_reminded, 3);
        assert_eq!(state.next_reminder, NOW + 1);
    }

    #[test]
    fn round_trip_reproduces_state_minus_dirty() {
        let state = ContactState {
            last_contact: 123_456,
            times_reminded: 7,
            next_reminder: 987_654,
            dirty: true,
        };
        let raw = state.to_json().unwrap();
        assert!(!raw.contains("dirty"));

        let reloaded =
            ContactState::from_stored(StoredState::parse(&raw), &scheduler(), NOW);
        assert!(!reloaded.dirty);
        assert_eq!(reloaded.last_contact, state.last_contact);
        assert_eq!(reloaded.times_reminded, state.times_reminded);
        assert_eq!(reloaded.next_reminder, state.next_reminder);
    }
}
