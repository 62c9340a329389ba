//! Cancellable live subscription
//!
//! A spawned task forwards snapshots from a [`SnapshotStream`] into a
//! callback. Cancellation is synchronous: once [`LiveSubscription::cancel`]
//! returns, the callback never runs again, even for a snapshot the task had
//! already pulled off the stream.

use std::sync::Arc;

use chat_core::SnapshotStream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Handle to a running live subscription. Dropping it cancels.
pub struct LiveSubscription {
    name: &'static str,
    live: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl LiveSubscription {
    /// Start forwarding `stream` into `apply`. Must be called inside a tokio
    /// runtime.
    pub fn spawn<T, F>(name: &'static str, mut stream: SnapshotStream<T>, mut apply: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(Vec<T>) + Send + 'static,
    {
        let live = Arc::new(Mutex::new(true));
        let flag = Arc::clone(&live);

        let task = tokio::spawn(async move {
            while let Some(snapshot) = stream.next().await {
                // Apply under the flag lock so cancel() waits for an
                // in-progress apply and blocks any later one.
                let live = flag.lock();
                if !*live {
                    return;
                }
                tracing::trace!(subscription = name, items = snapshot.len(), "Snapshot received");
                apply(snapshot);
            }
            tracing::debug!(subscription = name, "Subscription stream ended");
        });

        tracing::debug!(subscription = name, "Subscribed");
        Self { name, live, task }
    }

    /// Stop delivery. Idempotent.
    pub fn cancel(&self) {
        let mut live = self.live.lock();
        if *live {
            *live = false;
            self.task.abort();
            tracing::debug!(subscription = self.name, "Unsubscribed");
        }
    }

    /// Whether snapshots may still be applied
    pub fn is_active(&self) -> bool {
        *self.live.lock() && !self.task.is_finished()
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for LiveSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSubscription")
            .field("name", &self.name)
            .field("live", &*self.live.lock())
            .finish()
    }
}
