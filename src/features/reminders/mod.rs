//! # Reminders Feature
//!
//! The reminder core: due-time computation, the per-contact state blob, and
//! the refresh/evaluate state machine.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod scheduler;
pub mod state;
pub mod state_machine;

pub use scheduler::{same_hour_as, ReminderScheduler, DAY_MS};
pub use state::{ContactState, StoredState};
pub use state_machine::ReminderStateMachine;
