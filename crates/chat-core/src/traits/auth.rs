//! Authentication port

use async_trait::async_trait;
use tokio::sync::watch;

use super::RepoResult;
use crate::entities::Session;

/// Hosted authentication service
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Interactive, provider-delegated sign-in
    async fn sign_in(&self) -> RepoResult<Session>;

    /// End the current session
    async fn sign_out(&self) -> RepoResult<()>;

    /// Auth state: the current session, or `None`, updated on every change
    fn watch_session(&self) -> watch::Receiver<Option<Session>>;
}
