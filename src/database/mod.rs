//! # Database
//!
//! SQLite-backed contact directory, conversation index and reminder outbox.
//! Reminder state lives in an opaque `contact_fields` row labeled after the
//! tracked group, so other tools can attach their own fields to a contact
//! without touching ours.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Outbox table for queued reminders
//! - 1.1.0: Message index with per-address lookup
//! - 1.0.0: Contacts and labeled opaque fields

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sqlite::{Connection, ConnectionWithFullMutex, State};
use std::sync::Arc;

use crate::features::contacts::{ContactDirectory, ContactRecord};
use crate::features::lookup::{Conversation, ConversationIndex};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    addresses TEXT NOT NULL DEFAULT '[]',
    group_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS contact_fields (
    contact_id INTEGER NOT NULL,
    label TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (contact_id, label)
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL,
    subject TEXT,
    link TEXT,
    sent_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_address ON messages (address, sent_at);
CREATE TABLE IF NOT EXISTS outbox (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient TEXT NOT NULL,
    subject TEXT NOT NULL,
    plain_body TEXT NOT NULL,
    html_body TEXT NOT NULL,
    queued_at INTEGER NOT NULL
);
";

#[derive(Clone)]
pub struct Database {
    conn: Arc<ConnectionWithFullMutex>,
}

impl Database {
    /// Open (or create) the database at the given path. `:memory:` works for
    /// tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open_with_full_mutex(path)?;
        conn.execute(SCHEMA)?;
        Ok(Database {
            conn: Arc::new(conn),
        })
    }

    pub async fn add_contact(&self, name: &str, addresses: &[String], group: &str) -> Result<i64> {
        let encoded = serde_json::to_string(addresses)?;
        let mut statement = self
            .conn
            .prepare("INSERT INTO contacts (name, addresses, group_name) VALUES (?, ?, ?)")?;
        statement.bind((1, name))?;
        statement.bind((2, encoded.as_str()))?;
        statement.bind((3, group))?;
        statement.next()?;

        let mut statement = self.conn.prepare("SELECT last_insert_rowid()")?;
        statement.next()?;
        Ok(statement.read::<i64, _>(0)?)
    }

    pub async fn contacts_in_group(&self, group: &str) -> Result<Vec<SqliteContact>> {
        let mut statement = self
            .conn
            .prepare("SELECT id, name, addresses FROM contacts WHERE group_name = ? ORDER BY id")?;
        statement.bind((1, group))?;

        let mut contacts = Vec::new();
        while statement.next()? == State::Row {
            let id = statement.read::<i64, _>(0)?;
            let name = statement.read::<String, _>(1)?;
            let raw_addresses = statement.read::<String, _>(2)?;
            let addresses: Vec<String> = serde_json::from_str(&raw_addresses).unwrap_or_default();
            contacts.push(SqliteContact {
                database: self.clone(),
                id,
                name,
                addresses,
            });
        }
        Ok(contacts)
    }

    pub async fn read_contact_field(&self, contact_id: i64, label: &str) -> Result<Option<String>> {
        let mut statement = self
            .conn
            .prepare("SELECT value FROM contact_fields WHERE contact_id = ? AND label = ?")?;
        statement.bind((1, contact_id))?;
        statement.bind((2, label))?;

        if statement.next()? == State::Row {
            Ok(Some(statement.read::<String, _>(0)?))
        } else {
            debug!("No field '{label}' for contact {contact_id}");
            Ok(None)
        }
    }

    pub async fn write_contact_field(
        &self,
        contact_id: i64,
        label: &str,
        value: &str,
    ) -> Result<()> {
        let mut statement = self.conn.prepare(
            "INSERT OR REPLACE INTO contact_fields (contact_id, label, value) VALUES (?, ?, ?)",
        )?;
        statement.bind((1, contact_id))?;
        statement.bind((2, label))?;
        statement.bind((3, value))?;
        statement.next()?;
        Ok(())
    }

    pub async fn clear_contact_field(&self, contact_id: i64, label: &str) -> Result<()> {
        let mut statement = self
            .conn
            .prepare("DELETE FROM contact_fields WHERE contact_id = ? AND label = ?")?;
        statement.bind((1, contact_id))?;
        statement.bind((2, label))?;
        statement.next()?;
        Ok(())
    }

    /// Record a message in the conversation index.
    pub async fn record_message(
        &self,
        address: &str,
        subject: Option<&str>,
        link: Option<&str>,
        sent_at: i64,
    ) -> Result<()> {
        let mut statement = self
            .conn
            .prepare("INSERT INTO messages (address, subject, link, sent_at) VALUES (?, ?, ?, ?)")?;
        statement.bind((1, address))?;
        statement.bind((2, subject))?;
        statement.bind((3, link))?;
        statement.bind((4, sent_at))?;
        statement.next()?;
        Ok(())
    }

    pub async fn queue_reminder(
        &self,
        recipient: &str,
        subject: &str,
        plain: &str,
        html: &str,
    ) -> Result<()> {
        let mut statement = self.conn.prepare(
            "INSERT INTO outbox (recipient, subject, plain_body, html_body, queued_at) \
             VALUES (?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, recipient))?;
        statement.bind((2, subject))?;
        statement.bind((3, plain))?;
        statement.bind((4, html))?;
        statement.bind((5, Utc::now().timestamp_millis()))?;
        statement.next()?;
        Ok(())
    }

    pub async fn outbox_len(&self) -> Result<usize> {
        let mut statement = self.conn.prepare("SELECT COUNT(*) FROM outbox")?;
        statement.next()?;
        Ok(statement.read::<i64, _>(0)? as usize)
    }
}

/// One row of the contacts table, live for one cycle.
pub struct SqliteContact {
    database: Database,
    id: i64,
    name: String,
    addresses: Vec<String>,
}

impl SqliteContact {
    pub fn id(&self) -> i64 {
        self.id
    }
}

#[async_trait]
impl ContactRecord for SqliteContact {
    fn identity(&self) -> String {
        self.id.to_string()
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn addresses(&self) -> &[String] {
        &self.addresses
    }

    async fn load_state(&self, field: &str) -> Result<Option<String>> {
        self.database.read_contact_field(self.id, field).await
    }

    async fn save_state(self, field: &str, value: &str) -> Result<()> {
        self.database.write_contact_field(self.id, field, value).await
    }
}

#[async_trait]
impl ContactDirectory for Database {
    type Contact = SqliteContact;

    async fn tracked_contacts(&self, group: &str) -> Result<Vec<SqliteContact>> {
        self.contacts_in_group(group).await
    }
}

#[async_trait]
impl ConversationIndex for Database {
    async fn last_conversation(&self, address: &str) -> Result<Option<Conversation>> {
        let mut statement = self.conn.prepare(
            "SELECT sent_at, subject, link FROM messages WHERE address = ? \
             ORDER BY sent_at DESC LIMIT 1",
        )?;
        statement.bind((1, address))?;

        if statement.next()? == State::Row {
            Ok(Some(Conversation {
                timestamp: statement.read::<i64, _>(0)?,
                subject: statement.read::<Option<String>, _>(1)?,
                link: statement.read::<Option<String>, _>(2)?,
            }))
        } else {
            Ok(None)
        }
    }
}
