// Core layer - shared configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure - SQLite-backed directory, index and outbox
pub mod database;

// Re-export core config
pub use crate::core::Config;

// Re-export feature items
pub use features::{
    // Contacts
    persist_state, ContactDirectory, ContactRecord,
    // Cycles
    refresh_pass, reminder_pass, PassSummary,
    // Delivery
    LogTransport, OutboxTransport, ReminderMessage, ReminderTransport,
    // Lookup
    Conversation, ConversationIndex,
    // Reminders
    ContactState, ReminderScheduler, ReminderStateMachine, StoredState,
};

// Re-export the database handle
pub use database::Database;
