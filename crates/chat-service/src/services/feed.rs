//! Message feed
//!
//! A live window over the newest messages plus older history pulled in one
//! page at a time. Held messages are kept newest-first, the order the store
//! returns them in, and are only ever shown through [`display_order`].
//!
//! Phases: `Idle` until the first live page arrives, then `Live`, with
//! `LoadingOlder` while a pagination fetch is in flight. `Closed` is terminal:
//! late live pages and late fetch results are discarded.

use std::collections::HashSet;
use std::sync::Arc;

use chat_core::{
    display_order, Clock, Message, MessageCursor, MessageQuery, MessageStore, NewMessage, Session,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::retry::RetryPolicy;
use super::subscription::LiveSubscription;

/// Feed lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    Live,
    LoadingOlder,
    Closed,
}

/// Result of one pagination step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OlderPage {
    /// Fetched batch, newest-first
    pub messages: Vec<Message>,
    /// Cursor after this batch; `None` once history is exhausted
    pub cursor: Option<MessageCursor>,
}

impl OlderPage {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug)]
struct FeedState {
    phase: FeedPhase,
    /// Latest live page, newest-first
    live: Vec<Message>,
    /// Everything older than the live page, newest-first
    history: Vec<Message>,
    cursor: Option<MessageCursor>,
    /// Set when the first pagination fetch starts. From then on the cursor
    /// belongs to pagination and live pages no longer move it.
    paging: bool,
}

impl FeedState {
    fn new() -> Self {
        Self {
            phase: FeedPhase::Idle,
            live: Vec::new(),
            history: Vec::new(),
            cursor: None,
            paging: false,
        }
    }

    fn held(&self) -> impl Iterator<Item = &Message> {
        self.live.iter().chain(self.history.iter())
    }

    fn apply_live_page(&mut self, page: Vec<Message>) {
        match self.phase {
            FeedPhase::Closed => return,
            FeedPhase::Idle => self.phase = FeedPhase::Live,
            FeedPhase::Live | FeedPhase::LoadingOlder => {}
        }

        if self.paging {
            // Messages that slid out of the live window are still on screen;
            // they become the newest part of the history.
            let kept: HashSet<&str> = page.iter().map(|m| m.id.as_str()).collect();
            let slid: Vec<Message> = self
                .live
                .drain(..)
                .filter(|m| !kept.contains(m.id.as_str()))
                .collect();
            if !slid.is_empty() {
                let mut history = slid;
                history.append(&mut self.history);
                self.history = history;
            }
        } else {
            self.cursor = MessageCursor::after_page(&page);
        }
        self.live = page;
    }

    fn append_older(&mut self, batch: Vec<Message>) -> usize {
        let mut seen: HashSet<String> = self.held().map(|m| m.id.to_string()).collect();
        let before = self.history.len();
        self.history.extend(
            batch
                .into_iter()
                .filter(|m| seen.insert(m.id.to_string())),
        );
        self.history.len() - before
    }

    fn display(&self) -> Vec<Message> {
        let held: Vec<Message> = self.held().cloned().collect();
        display_order(&held)
    }
}

struct FeedShared {
    state: Mutex<FeedState>,
    messages: watch::Sender<Vec<Message>>,
}

impl FeedShared {
    fn publish(&self, state: &FeedState) {
        self.messages.send_replace(state.display());
    }
}

/// Puts the feed back to `Live` when a fetch ends, however it ends
struct LoadingGuard<'a> {
    shared: &'a FeedShared,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if state.phase == FeedPhase::LoadingOlder {
            state.phase = FeedPhase::Live;
        }
    }
}

/// Live message feed with backward pagination
pub struct MessageFeed {
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    page_size: usize,
    shared: Arc<FeedShared>,
    subscription: Mutex<Option<LiveSubscription>>,
}

impl MessageFeed {
    pub fn new(ctx: &ServiceContext) -> Self {
        let settings = ctx.settings();
        let (messages, _) = watch::channel(Vec::new());
        Self {
            store: ctx.message_store(),
            clock: ctx.clock(),
            retry: settings.retry,
            page_size: settings.page_size,
            shared: Arc::new(FeedShared {
                state: Mutex::new(FeedState::new()),
                messages,
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe to the newest `page_size` messages. Every notification
    /// replaces the live page.
    pub fn subscribe_latest(&self) {
        let shared = Arc::clone(&self.shared);
        let subscription = LiveSubscription::spawn(
            "messages",
            self.store.watch_latest(self.page_size),
            move |page| {
                let mut state = shared.state.lock();
                state.apply_live_page(page);
                shared.publish(&state);
            },
        );

        if let Some(previous) = self.subscription.lock().replace(subscription) {
            previous.cancel();
        }
    }

    /// Fetch the page before the current cursor and append it to history.
    ///
    /// With no cursor (empty feed, or history exhausted) nothing is fetched
    /// and an empty page is returned. A failed fetch leaves the held messages
    /// untouched.
    ///
    /// # Errors
    /// `LoadInFlight` while another call is fetching, `FeedNotLive` before the
    /// first live page or after close, or the store error of a failed fetch.
    #[instrument(skip(self))]
    pub async fn load_older(&self) -> ServiceResult<OlderPage> {
        let cursor = {
            let mut state = self.shared.state.lock();
            match state.phase {
                FeedPhase::LoadingOlder => return Err(ServiceError::LoadInFlight),
                FeedPhase::Idle | FeedPhase::Closed => return Err(ServiceError::FeedNotLive),
                FeedPhase::Live => {}
            }
            let Some(cursor) = state.cursor.clone() else {
                debug!("No cursor, nothing older to load");
                return Ok(OlderPage::default());
            };
            // A live page landing mid-fetch must keep what slides out of the
            // window; the batch only covers messages older than `cursor`.
            state.paging = true;
            state.phase = FeedPhase::LoadingOlder;
            cursor
        };
        let _loading = LoadingGuard {
            shared: &self.shared,
        };

        let batch = match self.fetch_older(cursor).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Failed to load older messages");
                return Err(e);
            }
        };
        let next = MessageCursor::after_page(&batch);

        let mut state = self.shared.state.lock();
        if state.phase == FeedPhase::Closed {
            debug!("Feed closed during fetch, discarding batch");
            return Ok(OlderPage {
                messages: batch,
                cursor: next,
            });
        }
        state.cursor = next.clone();
        let added = state.append_older(batch.clone());
        self.shared.publish(&state);
        debug!(fetched = batch.len(), added, "Loaded older messages");

        Ok(OlderPage {
            messages: batch,
            cursor: next,
        })
    }

    /// One-shot fetch of the page strictly older than `cursor`. Does not
    /// touch the feed.
    pub async fn fetch_older(&self, cursor: MessageCursor) -> ServiceResult<Vec<Message>> {
        let query = MessageQuery::older_than(cursor, self.page_size);
        Ok(self.store.find_page(&query).await?)
    }

    /// Append an older batch after the held messages, skipping ids already
    /// held. Returns how many were added.
    pub fn append_older(&self, batch: Vec<Message>) -> usize {
        let mut state = self.shared.state.lock();
        let added = state.append_older(batch);
        if added > 0 {
            self.shared.publish(&state);
        }
        added
    }

    /// Post a message as `session`. Blank text is ignored without a write.
    /// The message shows up through the live subscription, not locally.
    #[instrument(skip(self, session, text), fields(user_id = %session.user_id))]
    pub async fn send_message(
        &self,
        session: &Session,
        text: &str,
    ) -> ServiceResult<Option<Message>> {
        if text.trim().is_empty() {
            debug!("Ignoring blank message");
            return Ok(None);
        }

        let new_message = NewMessage::from_session(session, text, self.clock.now());
        let message = self
            .retry
            .run("message create", || self.store.create(&new_message))
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to send message"))?;

        debug!(message_id = %message.id, "Message sent");
        Ok(Some(message))
    }

    /// Cancel the live subscription and drop all held messages
    pub fn close(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }

        let mut state = self.shared.state.lock();
        state.phase = FeedPhase::Closed;
        state.live.clear();
        state.history.clear();
        state.cursor = None;
        self.shared.publish(&state);
    }

    /// Held messages in display order
    pub fn messages(&self) -> Vec<Message> {
        self.shared.state.lock().display()
    }

    /// Held messages in display order, updated on every change
    pub fn watch_messages(&self) -> watch::Receiver<Vec<Message>> {
        self.shared.messages.subscribe()
    }

    pub fn cursor(&self) -> Option<MessageCursor> {
        self.shared.state.lock().cursor.clone()
    }

    pub fn phase(&self) -> FeedPhase {
        self.shared.state.lock().phase
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl std::fmt::Debug for MessageFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageFeed")
            .field("page_size", &self.page_size)
            .field("phase", &self.phase())
            .finish()
    }
}
