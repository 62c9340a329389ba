//! Failure injection and call accounting.
//!
//! The hosted backend can reject writes, fail reads, or answer slowly. Tests
//! drive those paths through a [`FaultInjector`] shared by every store of a
//! [`MemoryBackend`](crate::MemoryBackend).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chat_core::{DomainError, RepoResult};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

/// Kind of write, for accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Presence,
    Message,
    Delete,
}

impl WriteKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Presence => "presence write",
            Self::Message => "message write",
            Self::Delete => "presence delete",
        }
    }
}

/// Shared fault switches and counters
#[derive(Debug, Default)]
pub struct FaultInjector {
    fail_writes: AtomicBool,
    fail_next_writes: AtomicUsize,
    fail_reads: AtomicBool,
    presence_writes: AtomicUsize,
    message_writes: AtomicUsize,
    deletes: AtomicUsize,
    read_gate: Arc<RwLock<()>>,
}

/// Blocks one-shot reads until dropped
#[derive(Debug)]
pub struct ReadHold {
    _guard: OwnedRwLockWriteGuard<()>,
}

impl FaultInjector {
    /// Reject every write until switched off
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reject only the next `count` writes
    pub fn fail_next_writes(&self, count: usize) {
        self.fail_next_writes.store(count, Ordering::SeqCst);
    }

    /// Fail every one-shot read until switched off
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Park one-shot reads until the returned hold is dropped
    pub async fn hold_reads(&self) -> ReadHold {
        ReadHold {
            _guard: Arc::clone(&self.read_gate).write_owned().await,
        }
    }

    /// Presence create/merge attempts, including rejected ones
    pub fn presence_writes(&self) -> usize {
        self.presence_writes.load(Ordering::SeqCst)
    }

    /// Message create attempts, including rejected ones
    pub fn message_writes(&self) -> usize {
        self.message_writes.load(Ordering::SeqCst)
    }

    /// Presence delete attempts, including rejected ones
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub(crate) fn check_write(&self, kind: WriteKind) -> RepoResult<()> {
        let counter = match kind {
            WriteKind::Presence => &self.presence_writes,
            WriteKind::Message => &self.message_writes,
            WriteKind::Delete => &self.deletes,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let scheduled = self
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if scheduled || self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::Unavailable(format!(
                "{} rejected by backend",
                kind.as_str()
            )));
        }
        Ok(())
    }

    pub(crate) async fn check_read(&self) -> RepoResult<()> {
        let _gate = self.read_gate.read().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::Unavailable("query failed".to_string()));
        }
        Ok(())
    }
}
