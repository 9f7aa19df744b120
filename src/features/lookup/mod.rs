//! # Conversation Lookup
//!
//! Finds the most recent conversation with a contact across all of their
//! addresses. The index itself is external; this module only folds its
//! per-address answers into a single latest hit.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

/// A conversation reference as the index reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    /// Epoch milliseconds of the most recent message.
    pub timestamp: i64,
    pub subject: Option<String>,
    /// Link back to the conversation, when the index can provide one.
    pub link: Option<String>,
}

/// External conversation index, queried one address at a time.
#[async_trait]
pub trait ConversationIndex {
    /// Most recent conversation matching the address, if any.
    async fn last_conversation(&self, address: &str) -> Result<Option<Conversation>>;
}

/// Latest conversation across every address of a contact. Empty addresses are
/// skipped; no hit on any address means no observed contact, not an error.
pub async fn last_conversation_for<I>(
    index: &I,
    addresses: &[String],
) -> Result<Option<Conversation>>
where
    I: ConversationIndex + Sync,
{
    let mut latest: Option<Conversation> = None;

    for address in addresses {
        if address.is_empty() {
            debug!("Empty address, nothing to search");
            continue;
        }

        let Some(conversation) = index.last_conversation(address).await? else {
            continue;
        };
        debug!(
            "Last conversation with {address} was at {}",
            conversation.timestamp
        );

        if latest
            .as_ref()
            .map_or(true, |best| conversation.timestamp > best.timestamp)
        {
            latest = Some(conversation);
        }
    }

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapIndex {
        by_address: HashMap<String, Conversation>,
    }

    #[async_trait]
    impl ConversationIndex for MapIndex {
        async fn last_conversation(&self, address: &str) -> Result<Option<Conversation>> {
            Ok(self.by_address.get(address).cloned())
        }
    }

    fn conversation(timestamp: i64, subject: &str) -> Conversation {
        Conversation {
            timestamp,
            subject: Some(subject.to_string()),
            link: None,
        }
    }

    fn index() -> MapIndex {
        let mut by_address = HashMap::new();
        by_address.insert("a@example.com".to_string(), conversation(1000, "older"));
        by_address.insert("b@example.com".to_string(), conversation(2000, "newer"));
        MapIndex { by_address }
    }

    #[tokio::test]
    async fn picks_the_latest_across_addresses() {
        let addresses = vec!["a@example.com".to_string(), "b@example.com".to_string()];
        let hit = last_conversation_for(&index(), &addresses).await.unwrap();
        assert_eq!(hit, Some(conversation(2000, "newer")));
    }

    #[tokio::test]
    async fn skips_empty_addresses() {
        let addresses = vec![String::new(), "a@example.com".to_string()];
        let hit = last_conversation_for(&index(), &addresses).await.unwrap();
        assert_eq!(hit, Some(conversation(1000, "older")));
    }

    #[tokio::test]
    async fn no_hits_means_no_observed_contact() {
        let addresses = vec!["unknown@example.com".to_string()];
        let hit = last_conversation_for(&index(), &addresses).await.unwrap();
        assert_eq!(hit, None);
    }
}
