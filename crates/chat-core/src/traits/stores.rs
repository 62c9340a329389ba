//! Store traits (ports) - what the client needs from the hosted document store
//!
//! The backend owns persistence and real-time sync. The client only issues
//! per-document writes, ordered one-shot queries, and live subscriptions that
//! yield whole-collection snapshots.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::entities::{Message, NewMessage, PresencePatch, PresenceRecord};
use crate::error::DomainError;
use crate::value_objects::{MessageCursor, UserId};

/// Result type for store operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Unbounded sequence of snapshots from a live query. Ends when the backend
/// drops the subscription; dropping the stream unsubscribes.
pub type SnapshotStream<T> = BoxStream<'static, Vec<T>>;

/// Upper bound on any page request
pub const MAX_PAGE_SIZE: usize = 100;

/// Query over the message collection, ordered newest-first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    /// Continue strictly after (older than) this cursor
    pub start_after: Option<MessageCursor>,
    /// Maximum number of messages (clamped to 1..=MAX_PAGE_SIZE)
    pub limit: usize,
}

impl MessageQuery {
    /// Newest page
    pub fn latest(limit: usize) -> Self {
        Self {
            start_after: None,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Page strictly older than `cursor`
    pub fn older_than(cursor: MessageCursor, limit: usize) -> Self {
        Self {
            start_after: Some(cursor),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

// ============================================================================
// Presence Store
// ============================================================================

#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Find the presence record for a user
    async fn find(&self, id: &UserId) -> RepoResult<Option<PresenceRecord>>;

    /// Create (or overwrite) a full record
    async fn create(&self, record: &PresenceRecord) -> RepoResult<()>;

    /// Merge the set fields of `patch` into the record, creating it if absent
    async fn merge(&self, id: &UserId, patch: &PresencePatch) -> RepoResult<()>;

    /// Delete the record for a user
    async fn delete(&self, id: &UserId) -> RepoResult<()>;

    /// Live subscription to the whole presence collection
    fn watch_all(&self) -> SnapshotStream<PresenceRecord>;
}

// ============================================================================
// Message Store
// ============================================================================

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Create a message; the store assigns its id
    async fn create(&self, message: &NewMessage) -> RepoResult<Message>;

    /// One-shot fetch of a newest-first page
    async fn find_page(&self, query: &MessageQuery) -> RepoResult<Vec<Message>>;

    /// Live subscription to the newest `limit` messages, newest-first
    fn watch_latest(&self, limit: usize) -> SnapshotStream<Message>;
}
