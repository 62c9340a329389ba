//! Auth provider that signs in a preconfigured identity.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chat_core::{AuthProvider, DomainError, RepoResult, Session};
use parking_lot::Mutex;
use tokio::sync::watch;

/// In-memory auth state
#[derive(Debug)]
pub struct MemoryAuth {
    identity: Mutex<Session>,
    state: watch::Sender<Option<Session>>,
    fail_sign_in: AtomicBool,
}

impl MemoryAuth {
    /// Provider that signs in as `identity`
    pub fn new(identity: Session) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            identity: Mutex::new(identity),
            state,
            fail_sign_in: AtomicBool::new(false),
        }
    }

    /// Make the next sign-ins fail as if the user dismissed the prompt
    pub fn set_fail_sign_in(&self, fail: bool) {
        self.fail_sign_in.store(fail, Ordering::SeqCst);
    }

    /// Change the identity handed out by later sign-ins
    pub fn set_identity(&self, identity: Session) {
        *self.identity.lock() = identity;
    }

    /// Push an auth change that did not come from this client, such as an
    /// account switch in another window or an expired session
    pub fn push_state(&self, session: Option<Session>) {
        self.state.send_replace(session);
    }

    /// Current auth state
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in(&self) -> RepoResult<Session> {
        if self.fail_sign_in.load(Ordering::SeqCst) {
            return Err(DomainError::SignInFailed(
                "sign-in was cancelled".to_string(),
            ));
        }

        let session = self.identity.lock().clone();
        self.state.send_replace(Some(session.clone()));
        tracing::info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> RepoResult<()> {
        if self.state.send_replace(None).is_some() {
            tracing::info!("Signed out");
        }
        Ok(())
    }

    fn watch_session(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }
}
