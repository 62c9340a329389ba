//! Pagination cursor over the newest-first message feed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageId;
use crate::entities::Message;

/// Marks the oldest message of the last fetched page.
///
/// The feed is ordered by `(created_at, id)`, so two messages sharing a
/// timestamp still page without gaps or repeats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageCursor {
    pub created_at: DateTime<Utc>,
    pub id: MessageId,
}

impl MessageCursor {
    /// Cursor positioned at the given message
    pub fn at(message: &Message) -> Self {
        Self {
            created_at: message.created_at,
            id: message.id.clone(),
        }
    }

    /// Cursor positioned at the last (oldest) message of a newest-first page
    pub fn after_page(page: &[Message]) -> Option<Self> {
        page.last().map(Self::at)
    }

    /// Whether `message` lies strictly past this cursor, i.e. is older
    pub fn precedes(&self, message: &Message) -> bool {
        (message.created_at, &message.id) < (self.created_at, &self.id)
    }
}
