//! Derives conversation read-models from the flat message table.
//!
//! A conversation is identified by (counterparty, listing): the same two
//! users talking about two listings are two conversations, and a
//! listing-independent exchange (no listing attached) is its own thread.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::Message;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub counterparty_id: Uuid,
    pub listing_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub counterparty_id: Uuid,
    pub listing_id: Option<Uuid>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

/// Group the viewer's messages into conversation summaries, newest
/// conversation first. `messages` may arrive in any order; only messages
/// the viewer sent or received belong here.
pub fn summarize(viewer_id: Uuid, messages: &[Message]) -> Vec<ConversationSummary> {
    let mut grouped: HashMap<ConversationKey, ConversationSummary> = HashMap::new();

    for message in messages {
        let counterparty_id = if message.sender_id == viewer_id {
            message.receiver_id
        } else {
            message.sender_id
        };
        let key = ConversationKey {
            counterparty_id,
            listing_id: message.listing_id,
        };

        let unread = message.receiver_id == viewer_id && !message.is_read;

        match grouped.get_mut(&key) {
            Some(summary) => {
                if message.created_at > summary.last_message_at {
                    summary.last_message = message.content.clone();
                    summary.last_message_at = message.created_at;
                }
                if unread {
                    summary.unread_count += 1;
                }
            }
            None => {
                grouped.insert(
                    key.clone(),
                    ConversationSummary {
                        counterparty_id,
                        listing_id: message.listing_id,
                        last_message: message.content.clone(),
                        last_message_at: message.created_at,
                        unread_count: if unread { 1 } else { 0 },
                    },
                );
            }
        }
    }

    let mut summaries: Vec<ConversationSummary> = grouped.into_values().collect();
    summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(
        sender: Uuid,
        receiver: Uuid,
        listing: Option<Uuid>,
        content: &str,
        at: DateTime<Utc>,
        is_read: bool,
    ) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            listing_id: listing,
            content: content.to_string(),
            is_read,
            flagged_reason: None,
            created_at: at,
        }
    }

    #[test]
    fn test_groups_by_counterparty_and_listing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let l1 = Uuid::new_v4();
        let l2 = Uuid::new_v4();
        let t0 = Utc::now();

        let messages = vec![
            message(b, a, Some(l1), "hi about L1", t0, false),
            message(a, b, Some(l1), "reply about L1", t0 + Duration::minutes(1), true),
            message(b, a, Some(l2), "hi about L2", t0 + Duration::minutes(2), false),
            message(c, a, Some(l1), "offer from C", t0 + Duration::minutes(3), false),
        ];

        let summaries = summarize(a, &messages);
        assert_eq!(summaries.len(), 3);

        // Newest first
        assert_eq!(summaries[0].counterparty_id, c);
        assert_eq!(summaries[1].counterparty_id, b);
        assert_eq!(summaries[1].listing_id, Some(l2));
        assert_eq!(summaries[2].counterparty_id, b);
        assert_eq!(summaries[2].listing_id, Some(l1));
    }

    #[test]
    fn test_listing_free_thread_is_its_own_conversation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let l1 = Uuid::new_v4();
        let t0 = Utc::now();

        let messages = vec![
            message(b, a, Some(l1), "about the listing", t0, false),
            message(b, a, None, "general question", t0 + Duration::minutes(1), false),
        ];

        let summaries = summarize(a, &messages);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].listing_id, None);
        assert_eq!(summaries[1].listing_id, Some(l1));
    }

    #[test]
    fn test_unread_counts_are_per_conversation_and_viewer_directed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let l1 = Uuid::new_v4();
        let l2 = Uuid::new_v4();
        let t0 = Utc::now();

        let messages = vec![
            message(b, a, Some(l1), "one", t0, false),
            message(b, a, Some(l1), "two", t0 + Duration::minutes(1), false),
            // Viewer's own unread outbound message never counts
            message(a, b, Some(l1), "mine", t0 + Duration::minutes(2), false),
            message(b, a, Some(l2), "read already", t0 + Duration::minutes(3), true),
        ];

        let summaries = summarize(a, &messages);
        let l1_summary = summaries.iter().find(|s| s.listing_id == Some(l1)).unwrap();
        let l2_summary = summaries.iter().find(|s| s.listing_id == Some(l2)).unwrap();

        assert_eq!(l1_summary.unread_count, 2);
        assert_eq!(l2_summary.unread_count, 0);
    }

    #[test]
    fn test_reading_a_thread_zeroes_its_unread_count() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let l1 = Uuid::new_v4();
        let t0 = Utc::now();

        let mut messages = vec![
            message(b, a, Some(l1), "one", t0, false),
            message(b, a, Some(l1), "two", t0 + Duration::minutes(1), false),
            message(c, a, Some(l1), "from someone else", t0 + Duration::minutes(2), false),
        ];

        let before = summarize(a, &messages);
        assert_eq!(
            before
                .iter()
                .find(|s| s.counterparty_id == b)
                .unwrap()
                .unread_count,
            2
        );

        // Fetching the B thread flips the viewer-directed read flags
        for m in messages.iter_mut() {
            if m.receiver_id == a && m.sender_id == b && m.listing_id == Some(l1) {
                m.is_read = true;
            }
        }

        let after = summarize(a, &messages);
        assert_eq!(
            after
                .iter()
                .find(|s| s.counterparty_id == b)
                .unwrap()
                .unread_count,
            0
        );
        // The other conversation is untouched
        assert_eq!(
            after
                .iter()
                .find(|s| s.counterparty_id == c)
                .unwrap()
                .unread_count,
            1
        );
    }

    #[test]
    fn test_last_message_wins_regardless_of_input_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let l1 = Uuid::new_v4();
        let t0 = Utc::now();

        let messages = vec![
            message(b, a, Some(l1), "latest", t0 + Duration::minutes(5), false),
            message(b, a, Some(l1), "earlier", t0, false),
        ];

        let summaries = summarize(a, &messages);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].last_message, "latest");
    }

    #[test]
    fn test_no_messages_no_conversations() {
        assert!(summarize(Uuid::new_v4(), &[]).is_empty());
    }
}
