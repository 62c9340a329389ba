//! Change notification for live queries.
//!
//! Every write bumps a version counter. Subscribers wake on the bump, re-run
//! their query and yield the full result as a snapshot. Bursts of writes may
//! coalesce into a single snapshot; the latest state is never skipped.

use std::sync::Arc;

use chat_core::SnapshotStream;
use futures_util::stream::{self, StreamExt};
use tokio::sync::watch;

/// Version counter shared by a collection and its live queries
#[derive(Debug, Clone)]
pub(crate) struct ChangeFeed {
    version: Arc<watch::Sender<u64>>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            version: Arc::new(tx),
        }
    }
}

impl ChangeFeed {
    /// Announce that the collection changed
    pub(crate) fn publish(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Live query: the current result first, then a fresh result after every
    /// change. Ends once the collection is dropped.
    pub(crate) fn snapshots<T, F>(&self, load: F) -> SnapshotStream<T>
    where
        T: Send + 'static,
        F: Fn() -> Vec<T> + Send + 'static,
    {
        let rx = self.version.subscribe();

        stream::unfold((rx, load, true), |(mut rx, load, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            // Mark seen before loading so a write racing the load re-triggers
            let _version = *rx.borrow_and_update();
            let snapshot = load();
            Some((snapshot, (rx, load, false)))
        })
        .boxed()
    }
}
