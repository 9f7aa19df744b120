//! # Reminder Scheduling
//!
//! Pure time computations for the reminder cadence: exponential backoff per
//! unanswered reminder, a jitter term so reminders don't cluster, and
//! hour-of-day alignment so a reminder arrives at a time of day the contact
//! is used to talking.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: First-reminder floor at one full interval after the last contact
//! - 1.0.0: Initial release with backoff, jitter and hour alignment

use chrono::{TimeZone, Timelike, Utc};
use log::debug;
use rand::Rng;

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Computes reminder due times. All timestamps are epoch milliseconds.
///
/// Configuration is passed in at construction; nothing is read from the
/// environment here.
#[derive(Debug, Clone)]
pub struct ReminderScheduler {
    interval_days: u32,
    backoff: f64,
}

impl ReminderScheduler {
    pub fn new(interval_days: u32, backoff: f64) -> Self {
        ReminderScheduler {
            interval_days,
            backoff,
        }
    }

    /// The base reminder interval in milliseconds.
    pub fn interval_ms(&self) -> i64 {
        i64::from(self.interval_days) * DAY_MS
    }

    /// Deterministic part of the reminder offset: the base interval grown
    /// exponentially by how many reminders were already sent.
    fn backoff_offset_ms(&self, times_reminded: u32) -> i64 {
        (self.interval_ms() as f64 * self.backoff.powi(times_reminded as i32)) as i64
    }

    /// Compute the next reminder due time.
    ///
    /// The offset grows exponentially with `times_reminded` and a jitter of up
    /// to 10% of the grown interval is subtracted so that many contacts don't
    /// all come due in the same run. The result keeps its calendar day but
    /// takes the hour, minute and second of `last_contact`.
    pub fn next_reminder_time(&self, now: i64, last_contact: i64, times_reminded: u32) -> i64 {
        let offset = self.backoff_offset_ms(times_reminded);
        let jitter = (self.interval_ms() as f64 / 10.0
            * self.backoff.powi(times_reminded as i32)
            * rand::rng().random::<f64>()) as i64;

        let time = same_hour_as(now + offset - jitter, last_contact);
        debug!("Computed offset {offset}ms, jitter {jitter}ms => due at {time}");
        time
    }

    /// Choose the first reminder time for a contact that has no schedule yet.
    ///
    /// With no known last contact the time is uniform in `[now, now + interval)`
    /// so newly tracked contacts don't all fire at once. With a known last
    /// contact the result is aligned to that contact's time of day and never
    /// falls before `last_contact + interval`.
    pub fn first_reminder_time(&self, now: i64, last_contact: Option<i64>) -> i64 {
        let interval = self.interval_ms();

        let Some(last) = last_contact else {
            return now + (interval as f64 * rand::rng().random::<f64>()) as i64;
        };

        let elapsed = now - last;
        let delay = if elapsed < interval { interval - elapsed } else { 0 };
        let window = (interval - delay).max(0);
        let offset = (window as f64 * rand::rng().random::<f64>()) as i64;

        let mut time = same_hour_as(now + delay + offset, last);
        // Alignment can pull the result under the floor by up to a day.
        if delay > 0 && time < last + interval {
            time += DAY_MS;
        }
        debug!("Chose first reminder time {time} (delay {delay}ms)");
        time
    }
}

/// Round `a` to the same hour, minute and second as `b`, keeping `a`'s
/// calendar day.
pub fn same_hour_as(a: i64, b: i64) -> i64 {
    let (Some(date_a), Some(date_b)) = (
        Utc.timestamp_millis_opt(a).single(),
        Utc.timestamp_millis_opt(b).single(),
    ) else {
        return a;
    };

    date_a
        .with_hour(date_b.hour())
        .and_then(|t| t.with_minute(date_b.minute()))
        .and_then(|t| t.with_second(date_b.second()))
        .map(|t| t.timestamp_millis())
        .unwrap_or(a)
}
