//! Message entity - an immutable chat message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Session;
use crate::value_objects::MessageId;

/// Message entity
///
/// Messages are never edited or deleted by this client. They are fetched
/// newest-first and shown oldest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Message {
    /// Get a truncated preview of the message text
    pub fn preview(&self, max_len: usize) -> &str {
        if self.text.len() <= max_len {
            &self.text
        } else {
            let mut end = max_len;
            while !self.text.is_char_boundary(end) && end > 0 {
                end -= 1;
            }
            &self.text[..end]
        }
    }
}

/// Payload for creating a message; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl NewMessage {
    /// Build a message authored by `session` at `created_at`
    pub fn from_session(session: &Session, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            created_at,
            email: session.email.clone(),
            avatar_url: session.avatar_url.clone(),
        }
    }

    /// Check if the text is blank after trimming
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Materialize with a store-assigned id
    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            text: self.text,
            created_at: self.created_at,
            email: self.email,
            avatar_url: self.avatar_url,
        }
    }
}

/// Presentation order: ascending by `created_at`, id breaking ties.
///
/// Storage and fetch order is newest-first; this is the only order shown.
pub fn display_order(messages: &[Message]) -> Vec<Message> {
    let mut ordered = messages.to_vec();
    ordered.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    ordered
}
