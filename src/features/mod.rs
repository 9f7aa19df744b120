//! # Features Layer
//!
//! One directory per feature: the reminder core, the contact record seam, the
//! conversation lookup, message delivery, and the two cycle drivers.

pub mod contacts;
pub mod cycles;
pub mod delivery;
pub mod lookup;
pub mod reminders;

pub use contacts::{persist_state, ContactDirectory, ContactRecord};
pub use cycles::{refresh_pass, reminder_pass, PassSummary};
pub use delivery::{
    days_ago, render_reminder, LogTransport, OutboxTransport, ReminderMessage, ReminderTransport,
    DEFAULT_TEMPLATE,
};
pub use lookup::{last_conversation_for, Conversation, ConversationIndex};
pub use reminders::{ContactState, ReminderScheduler, ReminderStateMachine, StoredState};
