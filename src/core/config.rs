//! # Configuration
//!
//! Runtime configuration, loaded from an optional YAML file with environment
//! variable overrides. The whole surface has working defaults so the binary
//! runs with no config at all.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: reset_count_on_contact switch
//! - 1.0.0: Initial release

use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::features::delivery::DEFAULT_TEMPLATE;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the tracked contact group. Also labels the per-contact field
    /// that stores reminder state.
    pub group: String,
    /// Days after the last contact before reminders start.
    pub reminder_interval: u32,
    /// Multiplier applied to the interval on each unanswered reminder.
    pub reminder_backoff: f64,
    /// Reset the reminder counter when a newer conversation is observed.
    /// Off by default: the counter carries across contact episodes, so
    /// chronically unanswered contacts keep their longer spacing.
    pub reset_count_on_contact: bool,
    pub database_path: String,
    /// Where queued reminders are addressed to (usually yourself).
    pub notify_address: String,
    pub message_template: String,
    /// Conversation lookups are expensive; refresh runs on a slow cadence.
    pub refresh_cadence_hours: u64,
    /// Sending reminders is cheap and timing-sensitive; this runs often.
    pub reminder_cadence_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            group: "Keep in touch".to_string(),
            reminder_interval: 90,
            reminder_backoff: 1.3,
            reset_count_on_contact: false,
            database_path: "keeper.db".to_string(),
            notify_address: String::new(),
            message_template: DEFAULT_TEMPLATE.to_string(),
            refresh_cadence_hours: 24,
            reminder_cadence_minutes: 60,
        }
    }
}

impl Config {
    /// Load configuration from `KEEPER_CONFIG` (default `keeper.yml`) if the
    /// file exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = env::var("KEEPER_CONFIG").unwrap_or_else(|_| "keeper.yml".to_string());
        let mut config = if Path::new(&path).exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Config::default()
        };

        if let Ok(database_path) = env::var("KEEPER_DATABASE") {
            config.database_path = database_path;
        }
        if let Ok(group) = env::var("KEEPER_GROUP") {
            config.group = group;
        }
        if let Ok(address) = env::var("KEEPER_NOTIFY") {
            config.notify_address = address;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.group.is_empty() {
            return Err(anyhow::anyhow!("group name must not be empty"));
        }
        if self.reminder_interval == 0 {
            return Err(anyhow::anyhow!("reminder_interval must be at least 1 day"));
        }
        if self.reminder_backoff < 1.0 {
            return Err(anyhow::anyhow!(
                "reminder_backoff below 1.0 would shrink the interval: {}",
                self.reminder_backoff
            ));
        }
        if self.reminder_cadence_minutes == 0 || self.refresh_cadence_hours == 0 {
            return Err(anyhow::anyhow!("cadences must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reminder_interval, 90);
        assert_eq!(config.reminder_backoff, 1.3);
        assert!(!config.reset_count_on_contact);
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let config: Config =
            serde_yaml::from_str("reminder_interval: 30\ngroup: Friends\n").unwrap();
        assert_eq!(config.reminder_interval, 30);
        assert_eq!(config.group, "Friends");
        // Untouched fields keep their defaults.
        assert_eq!(config.reminder_backoff, 1.3);
        assert_eq!(config.message_template, DEFAULT_TEMPLATE);
    }

    #[test]
    fn shrinking_backoff_is_rejected() {
        let config = Config {
            reminder_backoff: 0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_group_is_rejected() {
        let config = Config {
            group: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
