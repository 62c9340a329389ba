//! Chat client
//!
//! Follows the authentication state: a signed-in session gets a
//! [`SessionScope`], signing out or switching accounts closes it.

use std::future::Future;
use std::sync::Arc;

use chat_core::{AuthProvider, Message, PresenceView, Session};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::feed::OlderPage;
use super::session::SessionScope;

/// Client bound to one auth provider and one backend
pub struct ChatClient {
    ctx: ServiceContext,
    auth: Arc<dyn AuthProvider>,
    scope: Mutex<Option<Arc<SessionScope>>>,
    /// Serializes scope open/close
    transition: tokio::sync::Mutex<()>,
}

impl ChatClient {
    pub fn new(ctx: ServiceContext, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            ctx,
            auth,
            scope: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Follow auth changes until `shutdown` resolves or the provider goes
    /// away, then close the active scope.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut state = self.auth.watch_session();
        tokio::pin!(shutdown);

        loop {
            let current = state.borrow_and_update().clone();
            self.handle_auth_change(current).await;

            tokio::select! {
                () = &mut shutdown => break,
                changed = state.changed() => {
                    if changed.is_err() {
                        debug!("Auth provider closed");
                        break;
                    }
                }
            }
        }

        self.close_scope().await;
    }

    /// Open, replace or close the scope to match `state`
    pub async fn handle_auth_change(&self, state: Option<Session>) {
        let _transition = self.transition.lock().await;

        let current = self.scope.lock().clone();
        if let (Some(scope), Some(session)) = (&current, &state) {
            if scope.user_id() == &session.user_id && !scope.is_closed() {
                return;
            }
        }

        if let Some(scope) = current {
            self.scope.lock().take();
            scope.close().await;
        }

        if let Some(session) = state {
            let scope = SessionScope::open(session, &self.ctx).await;
            *self.scope.lock() = Some(Arc::new(scope));
        }
    }

    /// Interactive sign-in through the auth provider
    #[instrument(skip(self))]
    pub async fn sign_in(&self) -> ServiceResult<Session> {
        let session = self
            .auth
            .sign_in()
            .await
            .inspect_err(|e| warn!(error = %e, "Sign-in failed"))?;

        info!(user_id = %session.user_id, "Signed in");
        self.handle_auth_change(Some(session.clone())).await;
        Ok(session)
    }

    /// Close the session scope, then sign out of the auth provider
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> ServiceResult<()> {
        self.handle_auth_change(None).await;
        self.auth
            .sign_out()
            .await
            .inspect_err(|e| warn!(error = %e, "Sign-out failed"))?;
        info!("Signed out");
        Ok(())
    }

    pub async fn send_message(&self, text: &str) -> ServiceResult<Option<Message>> {
        self.active_scope()?.send_message(text).await
    }

    pub async fn load_older(&self) -> ServiceResult<OlderPage> {
        self.active_scope()?.load_older().await
    }

    pub fn roster(&self) -> ServiceResult<Vec<PresenceView>> {
        Ok(self.active_scope()?.roster())
    }

    pub fn messages(&self) -> ServiceResult<Vec<Message>> {
        Ok(self.active_scope()?.messages())
    }

    /// The open scope
    ///
    /// # Errors
    /// `NotSignedIn` when no session is active
    pub fn active_scope(&self) -> ServiceResult<Arc<SessionScope>> {
        self.scope.lock().clone().ok_or(ServiceError::NotSignedIn)
    }

    pub fn current_session(&self) -> Option<Session> {
        self.scope.lock().as_ref().map(|scope| scope.session().clone())
    }

    async fn close_scope(&self) {
        self.handle_auth_change(None).await;
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("ctx", &self.ctx)
            .field("signed_in", &self.scope.lock().is_some())
            .finish()
    }
}
