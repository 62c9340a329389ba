//! Presence collection: one JSON document per user, keyed by user id.
//!
//! Documents are stored as raw JSON objects so merge-updates behave like the
//! hosted store: fields named in a patch are overwritten, every other field
//! already on the document survives.

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{
    DomainError, PresencePatch, PresenceRecord, PresenceStore, RepoResult, SnapshotStream, UserId,
};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::changes::ChangeFeed;
use crate::faults::{FaultInjector, WriteKind};

type Document = Map<String, Value>;

/// In-memory presence collection
#[derive(Debug, Clone, Default)]
pub struct MemoryPresenceStore {
    docs: Arc<DashMap<UserId, Document>>,
    changes: ChangeFeed,
    faults: Arc<FaultInjector>,
}

impl MemoryPresenceStore {
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

    /// Write a raw document, bypassing faults. Test seeding only.
    pub fn put_document(&self, id: &UserId, document: Value) {
        if let Value::Object(fields) = document {
            self.docs.insert(id.clone(), fields);
            self.changes.publish();
        }
    }

    /// Raw stored document
    pub fn document(&self, id: &UserId) -> Option<Value> {
        self.docs.get(id).map(|doc| Value::Object(doc.clone()))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn snapshot(docs: &DashMap<UserId, Document>) -> Vec<PresenceRecord> {
        let mut records: Vec<PresenceRecord> = docs
            .iter()
            .filter_map(|entry| match decode(entry.value()) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(user_id = %entry.key(), error = %e, "Skipping malformed presence document");
                    None
                }
            })
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn find(&self, id: &UserId) -> RepoResult<Option<PresenceRecord>> {
        self.faults.check_read().await?;

        let doc = self.docs.get(id).map(|doc| doc.clone());
        doc.as_ref().map(decode).transpose()
    }

    async fn create(&self, record: &PresenceRecord) -> RepoResult<()> {
        self.faults.check_write(WriteKind::Presence)?;

        let doc = encode(record)?;
        self.docs.insert(record.id.clone(), doc);
        self.changes.publish();

        tracing::debug!(user_id = %record.id, "Presence record created");
        Ok(())
    }

    async fn merge(&self, id: &UserId, patch: &PresencePatch) -> RepoResult<()> {
        self.faults.check_write(WriteKind::Presence)?;

        let fields = encode(patch)?;
        {
            let mut doc = self.docs.entry(id.clone()).or_insert_with(|| {
                let mut doc = Document::new();
                doc.insert("id".to_string(), Value::String(id.to_string()));
                doc
            });
            doc.extend(fields);
        }
        self.changes.publish();
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> RepoResult<()> {
        self.faults.check_write(WriteKind::Delete)?;

        if self.docs.remove(id).is_some() {
            self.changes.publish();
            tracing::debug!(user_id = %id, "Presence record deleted");
        }
        Ok(())
    }

    fn watch_all(&self) -> SnapshotStream<PresenceRecord> {
        let docs = Arc::clone(&self.docs);
        self.changes.snapshots(move || Self::snapshot(&docs))
    }
}

fn encode<T: Serialize>(value: &T) -> RepoResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(DomainError::InvalidDocument(format!(
            "expected an object, got {other}"
        ))),
    }
}

fn decode(doc: &Document) -> RepoResult<PresenceRecord> {
    Ok(serde_json::from_value(Value::Object(doc.clone()))?)
}
