//! Presence tracker
//!
//! Keeps the signed-in user's presence record fresh with a heartbeat and turns
//! the presence collection into a sorted roster. Presence is best effort:
//! every failed write is logged and swallowed.

use std::sync::Arc;
use std::time::Duration;

use chat_core::{
    build_roster, Clock, PresencePatch, PresenceRecord, PresenceStore, PresenceView, Session,
    UserId,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace, warn};

use super::context::ServiceContext;
use super::retry::RetryPolicy;
use super::subscription::LiveSubscription;

/// Presence tracker for one session
pub struct PresenceTracker {
    store: Arc<dyn PresenceStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    heartbeat_interval: Duration,
    active_threshold: Duration,
    roster: Arc<watch::Sender<Vec<PresenceView>>>,
    /// Newest `lastActiveAt` this tracker has written
    last_written: Arc<Mutex<Option<DateTime<Utc>>>>,
    subscription: Mutex<Option<LiveSubscription>>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceTracker {
    pub fn new(ctx: &ServiceContext) -> Self {
        let settings = ctx.settings();
        let (roster, _) = watch::channel(Vec::new());
        Self {
            store: ctx.presence_store(),
            clock: ctx.clock(),
            retry: settings.retry,
            heartbeat_interval: settings.heartbeat_interval,
            active_threshold: settings.active_threshold,
            roster: Arc::new(roster),
            last_written: Arc::new(Mutex::new(None)),
            subscription: Mutex::new(None),
            heartbeat: Mutex::new(None),
        }
    }

    /// Create or refresh the session's record. Never fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn on_sign_in(&self, session: &Session) {
        let now = next_stamp(self.clock.as_ref(), &self.last_written);
        let id = &session.user_id;

        let result = match self.store.find(id).await {
            Ok(None) => {
                let record = PresenceRecord::for_session(session, now);
                self.retry
                    .run("presence create", || self.store.create(&record))
                    .await
            }
            Ok(Some(_)) => {
                let patch = PresencePatch::sign_in(session, now);
                self.retry
                    .run("presence merge", || self.store.merge(id, &patch))
                    .await
            }
            Err(e) => {
                // Merge creates the record when absent, so it covers both cases
                warn!(error = %e, "Presence lookup failed, writing without it");
                let patch = PresencePatch::sign_in(session, now);
                self.retry
                    .run("presence merge", || self.store.merge(id, &patch))
                    .await
            }
        };

        match result {
            Ok(()) => info!("Presence record written"),
            Err(e) => warn!(error = %e, "Failed to write presence record"),
        }
    }

    /// Refresh the session's record every heartbeat interval, starting one
    /// interval from now. Replaces a running heartbeat.
    pub fn start_heartbeat(&self, session: &Session) {
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let last_written = Arc::clone(&self.last_written);
        let retry = self.retry;
        let user_id = session.user_id.clone();
        let period = self.heartbeat_interval;

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let patch = PresencePatch::heartbeat(next_stamp(clock.as_ref(), &last_written));
                match retry
                    .run("heartbeat", || store.merge(&user_id, &patch))
                    .await
                {
                    Ok(()) => trace!(user_id = %user_id, "Heartbeat"),
                    Err(e) => warn!(user_id = %user_id, error = %e, "Heartbeat write failed"),
                }
            }
        });

        if let Some(previous) = self.heartbeat.lock().replace(task) {
            previous.abort();
        }
        debug!(user_id = %session.user_id, period_secs = period.as_secs(), "Heartbeat started");
    }

    /// Stop the heartbeat and wait until no heartbeat write is in flight
    pub async fn stop_heartbeat(&self) {
        let task = self.heartbeat.lock().take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
            debug!("Heartbeat stopped");
        }
    }

    /// Subscribe to the whole presence collection. Replaces a running
    /// subscription.
    pub fn subscribe(&self) {
        let clock = Arc::clone(&self.clock);
        let threshold = self.active_threshold;
        let roster = Arc::clone(&self.roster);

        let subscription =
            LiveSubscription::spawn("presence", self.store.watch_all(), move |records| {
                roster.send_replace(build_roster(records, clock.now(), threshold));
            });

        if let Some(previous) = self.subscription.lock().replace(subscription) {
            previous.cancel();
        }
    }

    /// Cancel the presence subscription and clear the roster
    pub fn unsubscribe(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
        self.roster.send_replace(Vec::new());
    }

    /// Delete the record. Failure is logged and not retried.
    #[instrument(skip(self))]
    pub async fn remove_record(&self, user_id: &UserId) {
        match self.store.delete(user_id).await {
            Ok(()) => debug!("Presence record deleted"),
            Err(e) => warn!(error = %e, "Failed to delete presence record"),
        }
    }

    /// Full sign-out: drop the subscription, stop the heartbeat, then delete
    /// the record once no heartbeat write can land after it
    pub async fn on_sign_out(&self, session: &Session) {
        self.unsubscribe();
        self.stop_heartbeat().await;
        self.remove_record(&session.user_id).await;
    }

    /// Synchronous teardown for drop paths. The delete runs on the current
    /// runtime if there is one; otherwise the record is left to go stale.
    pub(crate) fn abandon(&self, user_id: &UserId) {
        self.unsubscribe();
        if let Some(task) = self.heartbeat.lock().take() {
            task.abort();
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                let user_id = user_id.clone();
                handle.spawn(async move {
                    if let Err(e) = store.delete(&user_id).await {
                        warn!(user_id = %user_id, error = %e, "Failed to delete presence record");
                    }
                });
            }
            Err(_) => {
                warn!(user_id = %user_id, "No runtime to delete presence record");
            }
        }
    }

    /// Latest roster snapshot
    pub fn roster(&self) -> Vec<PresenceView> {
        self.roster.borrow().clone()
    }

    /// Roster updates
    pub fn watch_roster(&self) -> watch::Receiver<Vec<PresenceView>> {
        self.roster.subscribe()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(LiveSubscription::is_active)
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

/// Current time, held at the last written stamp if the clock stepped back
fn next_stamp(clock: &dyn Clock, last_written: &Mutex<Option<DateTime<Utc>>>) -> DateTime<Utc> {
    let now = clock.now();
    let mut last = last_written.lock();
    let stamp = last.map_or(now, |last| last.max(now));
    *last = Some(stamp);
    stamp
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("active_threshold", &self.active_threshold)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
