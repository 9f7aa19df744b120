//! # Reminder Delivery
//!
//! Renders the reminder message in a linked and a plain form and hands it to
//! a transport. The default transport queues into the database outbox; actual
//! sending is someone else's job.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.4.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Outbox transport
//! - 1.0.0: Template rendering and log transport

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::collections::HashMap;

use crate::database::Database;
use crate::features::lookup::Conversation;
use crate::features::reminders::DAY_MS;

/// Default reminder template. Recognized placeholders: `{name}`, `{left}`,
/// `{a_begin}`, `{subject}`, `{a_end}`, `{right}`. The bracketing fragments
/// collapse to nothing when no conversation is known.
pub const DEFAULT_TEMPLATE: &str =
    "You haven't talked to {name} in a while{left}{a_begin}{subject}{a_end}{right}.";

/// A rendered reminder, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderMessage {
    pub subject: String,
    pub plain: String,
    pub html: String,
}

/// Whole days between `then` and `now`.
pub fn days_ago(now: i64, then: i64) -> i64 {
    (now - then) / DAY_MS
}

/// Replace `{key}` placeholders in the template with their values.
fn replace(template: &str, params: &HashMap<&str, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in params {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Render the reminder for one contact, once with the conversation subject
/// linked and once plain.
pub fn render_reminder(
    template: &str,
    name: &str,
    conversation: Option<&Conversation>,
    now: i64,
) -> ReminderMessage {
    let mut params: HashMap<&str, String> = HashMap::new();
    params.insert("name", name.to_string());

    match conversation {
        Some(convo) => {
            params.insert(
                "left",
                format!(" ({} days: ", days_ago(now, convo.timestamp)),
            );
            params.insert("subject", convo.subject.clone().unwrap_or_default());
            params.insert(
                "a_begin",
                convo
                    .link
                    .as_ref()
                    .map(|link| format!("<a href=\"{link}\">"))
                    .unwrap_or_default(),
            );
            params.insert(
                "a_end",
                if convo.link.is_some() { "</a>" } else { "" }.to_string(),
            );
            params.insert("right", ")".to_string());
        }
        None => {
            for key in ["left", "subject", "a_begin", "a_end", "right"] {
                params.insert(key, String::new());
            }
        }
    }

    let html = replace(template, &params);

    // Plain version drops the anchor.
    params.insert("a_begin", String::new());
    params.insert("a_end", String::new());
    let plain = replace(template, &params);

    ReminderMessage {
        subject: name.to_string(),
        plain,
        html,
    }
}

/// Hands a rendered reminder off for delivery.
#[async_trait]
pub trait ReminderTransport {
    async fn deliver(&self, recipient: &str, message: &ReminderMessage) -> Result<()>;
}

/// Transport that only logs. Useful for dry runs.
pub struct LogTransport;

#[async_trait]
impl ReminderTransport for LogTransport {
    async fn deliver(&self, recipient: &str, message: &ReminderMessage) -> Result<()> {
        info!("Reminder for {recipient}: {}", message.plain);
        Ok(())
    }
}

/// Queues rendered reminders in the database outbox, where an external mailer
/// picks them up.
pub struct OutboxTransport {
    database: Database,
}

impl OutboxTransport {
    pub fn new(database: Database) -> Self {
        OutboxTransport { database }
    }
}

#[async_trait]
impl ReminderTransport for OutboxTransport {
    async fn deliver(&self, recipient: &str, message: &ReminderMessage) -> Result<()> {
        self.database
            .queue_reminder(recipient, &message.subject, &message.plain, &message.html)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn renders_linked_and_plain_forms() {
        let convo = Conversation {
            timestamp: NOW - 42 * DAY_MS,
            subject: Some("Lunch next week?".to_string()),
            link: Some("https://mail.example.com/thread/123".to_string()),
        };

        let message = render_reminder(DEFAULT_TEMPLATE, "Ada", Some(&convo), NOW);
        assert_eq!(
            message.html,
            "You haven't talked to Ada in a while (42 days: \
             <a href=\"https://mail.example.com/thread/123\">Lunch next week?</a>)."
        );
        assert_eq!(
            message.plain,
            "You haven't talked to Ada in a while (42 days: Lunch next week?)."
        );
        assert_eq!(message.subject, "Ada");
    }

    #[test]
    fn renders_bare_sentence_without_conversation() {
        let message = render_reminder(DEFAULT_TEMPLATE, "Ada", None, NOW);
        assert_eq!(message.plain, "You haven't talked to Ada in a while.");
        assert_eq!(message.html, message.plain);
    }

    #[test]
    fn unlinked_conversation_renders_without_anchor() {
        let convo = Conversation {
            timestamp: NOW - DAY_MS,
            subject: Some("hello".to_string()),
            link: None,
        };

        let message = render_reminder(DEFAULT_TEMPLATE, "Ada", Some(&convo), NOW);
        assert_eq!(
            message.html,
            "You haven't talked to Ada in a while (1 days: hello)."
        );
        assert_eq!(message.html, message.plain);
    }

    #[test]
    fn days_ago_counts_whole_days() {
        assert_eq!(days_ago(NOW, NOW - DAY_MS), 1);
        assert_eq!(days_ago(NOW, NOW - DAY_MS - DAY_MS / 2), 1);
        assert_eq!(days_ago(NOW, NOW), 0);
    }
}
