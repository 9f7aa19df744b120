//! # Cycle Drivers
//!
//! The two periodic passes over the tracked group. The refresh pass searches
//! the conversation index for newer contact and is comparatively expensive,
//! so it runs daily. The reminder pass is cheap and timing-sensitive, so it
//! runs hourly. A failure on one contact is logged and never aborts the rest
//! of the pass.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.5.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Per-contact error isolation with pass summaries
//! - 1.0.0: Initial refresh and reminder passes

use anyhow::Result;
use chrono::Utc;
use log::{error, info};

use crate::features::contacts::{persist_state, ContactDirectory, ContactRecord};
use crate::features::delivery::{render_reminder, ReminderTransport};
use crate::features::lookup::{last_conversation_for, ConversationIndex};
use crate::features::reminders::{ContactState, ReminderStateMachine, StoredState};

/// Outcome counts for one pass over the tracked group.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PassSummary {
    pub processed: usize,
    /// Contacts whose state was written back.
    pub updated: usize,
    /// Contacts for which a reminder went out (reminder pass only).
    pub due: usize,
    pub failed: usize,
}

/// Update every tracked contact with the time of last contact. Reminders
/// themselves go out in [`reminder_pass`].
pub async fn refresh_pass<D, I>(
    directory: &D,
    index: &I,
    machine: &ReminderStateMachine,
    group: &str,
) -> Result<PassSummary>
where
    D: ContactDirectory + Sync,
    I: ConversationIndex + Sync,
{
    let contacts = directory.tracked_contacts(group).await?;
    info!(
        "Refreshing last contact for {} contacts in '{group}'",
        contacts.len()
    );

    let mut summary = PassSummary::default();
    for contact in contacts {
        summary.processed += 1;
        let name = contact.display_name().to_string();

        match refresh_contact(contact, index, machine, group).await {
            Ok(true) => summary.updated += 1,
            Ok(false) => {}
            Err(err) => {
                summary.failed += 1;
                error!("Refresh failed for {name}: {err:#}");
            }
        }
    }
    Ok(summary)
}

/// Send reminders for any contacts which are overdue.
pub async fn reminder_pass<D, I, T>(
    directory: &D,
    index: &I,
    machine: &ReminderStateMachine,
    transport: &T,
    group: &str,
    template: &str,
    recipient: &str,
) -> Result<PassSummary>
where
    D: ContactDirectory + Sync,
    I: ConversationIndex + Sync,
    T: ReminderTransport + Sync,
{
    let contacts = directory.tracked_contacts(group).await?;
    let mut summary = PassSummary::default();

    for contact in contacts {
        summary.processed += 1;
        let name = contact.display_name().to_string();

        match remind_contact(contact, index, machine, transport, group, template, recipient)
            .await
        {
            Ok(outcome) => {
                if outcome.wrote {
                    summary.updated += 1;
                }
                if outcome.delivered {
                    summary.due += 1;
                }
            }
            Err(err) => {
                summary.failed += 1;
                error!("Reminder pass failed for {name}: {err:#}");
            }
        }
    }
    Ok(summary)
}

struct RemindOutcome {
    wrote: bool,
    delivered: bool,
}

async fn refresh_contact<C, I>(
    contact: C,
    index: &I,
    machine: &ReminderStateMachine,
    group: &str,
) -> Result<bool>
where
    C: ContactRecord,
    I: ConversationIndex + Sync,
{
    let now = Utc::now().timestamp_millis();
    let mut state = load_state(&contact, machine, group, now).await?;

    let observed = last_conversation_for(index, contact.addresses()).await?;
    machine.refresh(&mut state, observed.map(|c| c.timestamp), now);

    let wrote = state.dirty;
    persist_state(contact, group, &state).await?;
    Ok(wrote)
}

async fn remind_contact<C, I, T>(
    contact: C,
    index: &I,
    machine: &ReminderStateMachine,
    transport: &T,
    group: &str,
    template: &str,
    recipient: &str,
) -> Result<RemindOutcome>
where
    C: ContactRecord,
    I: ConversationIndex + Sync,
    T: ReminderTransport + Sync,
{
    let now = Utc::now().timestamp_millis();
    let mut state = load_state(&contact, machine, group, now).await?;

    let due = machine.evaluate(&mut state, now);
    let name = contact.display_name().to_string();
    let addresses = contact.addresses().to_vec();

    // State goes out before the message does: a delivery failure then costs
    // one missed reminder instead of a duplicate.
    let wrote = state.dirty;
    persist_state(contact, group, &state).await?;

    if !due {
        return Ok(RemindOutcome {
            wrote,
            delivered: false,
        });
    }

    info!("Reminder due for {name}");
    let conversation = last_conversation_for(index, &addresses).await?;
    let message = render_reminder(template, &name, conversation.as_ref(), now);
    transport.deliver(recipient, &message).await?;

    Ok(RemindOutcome {
        wrote,
        delivered: true,
    })
}

async fn load_state<C: ContactRecord>(
    contact: &C,
    machine: &ReminderStateMachine,
    field: &str,
    now: i64,
) -> Result<ContactState> {
    let raw = contact.load_state(field).await?;
    let stored = raw.as_deref().and_then(StoredState::parse);
    Ok(ContactState::from_stored(stored, machine.scheduler(), now))
}
