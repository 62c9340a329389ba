//! Bundle of collections sharing one set of fault switches

use std::sync::Arc;

use chat_core::{MessageStore, PresenceStore};

use crate::faults::FaultInjector;
use crate::messages::MemoryMessageStore;
use crate::presence::MemoryPresenceStore;

/// The whole in-memory backend. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    presence: MemoryPresenceStore,
    messages: MemoryMessageStore,
    faults: Arc<FaultInjector>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let faults = Arc::new(FaultInjector::default());
        Self {
            presence: MemoryPresenceStore::with_faults(Arc::clone(&faults)),
            messages: MemoryMessageStore::with_faults(Arc::clone(&faults)),
            faults,
        }
    }

    pub fn presence(&self) -> &MemoryPresenceStore {
        &self.presence
    }

    pub fn messages(&self) -> &MemoryMessageStore {
        &self.messages
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub fn presence_store(&self) -> Arc<dyn PresenceStore> {
        Arc::new(self.presence.clone())
    }

    pub fn message_store(&self) -> Arc<dyn MessageStore> {
        Arc::new(self.messages.clone())
    }
}
