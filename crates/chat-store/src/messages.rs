//! Message collection ordered by `(created_at, id)`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{
    DomainError, Message, MessageId, MessageQuery, MessageStore, NewMessage, RepoResult,
    SnapshotStream, MAX_PAGE_SIZE,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::changes::ChangeFeed;
use crate::faults::{FaultInjector, WriteKind};

type MessageKey = (DateTime<Utc>, MessageId);
type Collection = BTreeMap<MessageKey, Message>;

/// In-memory message collection
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageStore {
    messages: Arc<RwLock<Collection>>,
    changes: ChangeFeed,
    faults: Arc<FaultInjector>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store sharing the given fault switches
    pub fn with_faults(faults: Arc<FaultInjector>) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    /// Insert a fully formed message, bypassing faults and validation
    pub fn insert(&self, message: Message) {
        let key = (message.created_at, message.id.clone());
        self.messages.write().insert(key, message);
        self.changes.publish();
    }

    /// Insert many messages with a single change notification
    pub fn seed(&self, messages: impl IntoIterator<Item = Message>) {
        {
            let mut collection = self.messages.write();
            for message in messages {
                collection.insert((message.created_at, message.id.clone()), message);
            }
        }
        self.changes.publish();
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    fn page(collection: &Collection, query: &MessageQuery) -> Vec<Message> {
        let newest_first: Box<dyn Iterator<Item = &Message>> = match &query.start_after {
            Some(cursor) => Box::new(
                collection
                    .range(..(cursor.created_at, cursor.id.clone()))
                    .rev()
                    .map(|(_, m)| m),
            ),
            None => Box::new(collection.values().rev()),
        };
        newest_first.take(query.limit).cloned().collect()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(&self, message: &NewMessage) -> RepoResult<Message> {
        if message.is_blank() {
            return Err(DomainError::EmptyMessage);
        }
        self.faults.check_write(WriteKind::Message)?;

        let message = message.clone().into_message(MessageId::generate());
        self.insert(message.clone());

        tracing::debug!(message_id = %message.id, "Message created");
        Ok(message)
    }

    async fn find_page(&self, query: &MessageQuery) -> RepoResult<Vec<Message>> {
        self.faults.check_read().await?;

        let collection = self.messages.read();
        Ok(Self::page(&collection, query))
    }

    fn watch_latest(&self, limit: usize) -> SnapshotStream<Message> {
        let messages = Arc::clone(&self.messages);
        let query = MessageQuery::latest(limit.min(MAX_PAGE_SIZE));
        self.changes
            .snapshots(move || Self::page(&messages.read(), &query))
    }
}
