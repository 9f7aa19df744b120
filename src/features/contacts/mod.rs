//! # Contact Records
//!
//! The interface between the reminder core and whatever holds the tracked
//! contacts. Core logic only sees identity, the address set and the two state
//! field operations; the backing store varies.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::features::reminders::ContactState;

/// One tracked contact for the duration of one cycle.
#[async_trait]
pub trait ContactRecord: Send {
    /// Stable identity, used in logs and failure reports.
    fn identity(&self) -> String;

    fn display_name(&self) -> &str;

    /// Addresses to search for conversations. May contain empty entries.
    fn addresses(&self) -> &[String];

    /// Read the raw state field. `None` when the field does not exist yet.
    async fn load_state(&self, field: &str) -> Result<Option<String>>;

    /// Write the raw state field, creating it if missing. Consumes the
    /// record: saving must be the last operation against a contact in a
    /// cycle, and a consumed handle cannot be touched again.
    async fn save_state(self, field: &str, value: &str) -> Result<()>;
}

/// Enumerates the tracked contact group.
#[async_trait]
pub trait ContactDirectory {
    type Contact: ContactRecord;

    async fn tracked_contacts(&self, group: &str) -> Result<Vec<Self::Contact>>;
}

/// Persist state only when it changed since load. A clean state issues no
/// write at all.
pub async fn persist_state<C: ContactRecord>(
    contact: C,
    field: &str,
    state: &ContactState,
) -> Result<()> {
    if !state.dirty {
        debug!("State for {} is clean, nothing to write", contact.display_name());
        return Ok(());
    }

    let value = state.to_json()?;
    debug!("Writing state for {}: {value}", contact.display_name());
    contact.save_state(field, &value).await
}
