//! Session scope
//!
//! Owns everything started for one signed-in session: the live message
//! subscription, the presence subscription and the heartbeat. Closing the
//! scope tears them down in that order and then deletes the session's
//! presence record.

use std::sync::atomic::{AtomicBool, Ordering};

use chat_core::{Message, PresenceView, Session, UserId};
use tokio::sync::watch;
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::feed::{MessageFeed, OlderPage};
use super::presence::PresenceTracker;

/// Resources of one signed-in session
#[derive(Debug)]
pub struct SessionScope {
    session: Session,
    feed: MessageFeed,
    presence: PresenceTracker,
    closed: AtomicBool,
}

impl SessionScope {
    /// Write the presence record, then start the heartbeat and both live
    /// subscriptions. A failed presence write does not fail the open.
    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn open(session: Session, ctx: &ServiceContext) -> Self {
        let presence = PresenceTracker::new(ctx);
        let feed = MessageFeed::new(ctx);

        presence.on_sign_in(&session).await;
        presence.start_heartbeat(&session);
        presence.subscribe();
        feed.subscribe_latest();

        info!("Session opened");
        Self {
            session,
            feed,
            presence,
            closed: AtomicBool::new(false),
        }
    }

    /// Tear down the session. Idempotent: only the first call does anything.
    #[instrument(skip(self), fields(user_id = %self.session.user_id))]
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.feed.close();
        self.presence.on_sign_out(&self.session).await;

        info!("Session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user_id(&self) -> &UserId {
        &self.session.user_id
    }

    /// Post a message as this session's user
    pub async fn send_message(&self, text: &str) -> ServiceResult<Option<Message>> {
        self.feed.send_message(&self.session, text).await
    }

    pub async fn load_older(&self) -> ServiceResult<OlderPage> {
        self.feed.load_older().await
    }

    pub fn feed(&self) -> &MessageFeed {
        &self.feed
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn roster(&self) -> Vec<PresenceView> {
        self.presence.roster()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.feed.messages()
    }

    pub fn watch_roster(&self) -> watch::Receiver<Vec<PresenceView>> {
        self.presence.watch_roster()
    }

    pub fn watch_messages(&self) -> watch::Receiver<Vec<Message>> {
        self.feed.watch_messages()
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.feed.close();
        self.presence.abandon(&self.session.user_id);
        info!(user_id = %self.session.user_id, "Session dropped without close");
    }
}
