//! Test helpers for integration tests
//!
//! Provides a harness over the in-memory backend and polling helpers for
//! state that settles asynchronously.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chat_core::{ManualClock, Session};
use chat_service::{
    ChatClient, RetryPolicy, ServiceContext, ServiceSettings, SessionScope,
};
use chat_store::{MemoryAuth, MemoryBackend};
use tokio::sync::watch;

use crate::fixtures::start_time;

/// How long a wait helper polls before giving up
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Services wired to a fresh in-memory backend and a manual clock
pub struct TestHarness {
    pub backend: MemoryBackend,
    pub clock: Arc<ManualClock>,
    pub ctx: ServiceContext,
}

impl TestHarness {
    /// Harness with default settings (30 per page, 5 s heartbeat, 30 s
    /// threshold, single write attempt)
    pub fn new() -> Self {
        Self::with_settings(ServiceSettings::default())
    }

    pub fn with_settings(settings: ServiceSettings) -> Self {
        let backend = MemoryBackend::new();
        let clock = Arc::new(ManualClock::new(start_time()));
        let ctx = ServiceContext::new(
            backend.presence_store(),
            backend.message_store(),
            clock.clone(),
            settings,
        );
        Self {
            backend,
            clock,
            ctx,
        }
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self::with_settings(ServiceSettings {
            page_size,
            ..ServiceSettings::default()
        })
    }

    pub fn with_retry(retry: RetryPolicy) -> Self {
        Self::with_settings(ServiceSettings {
            retry,
            ..ServiceSettings::default()
        })
    }

    /// Open a session scope directly, bypassing auth
    pub async fn open(&self, session: Session) -> SessionScope {
        SessionScope::open(session, &self.ctx).await
    }

    /// Open a scope and wait for its first live message page
    pub async fn open_live(&self, session: Session) -> Result<SessionScope> {
        let scope = self.open(session).await;
        let feed = scope.feed();
        wait_until(|| feed.phase() != chat_service::FeedPhase::Idle).await?;
        Ok(scope)
    }

    /// Auth provider handing out `session`
    pub fn auth(&self, session: Session) -> Arc<MemoryAuth> {
        Arc::new(MemoryAuth::new(session))
    }

    /// Client over this backend
    pub fn client(&self, auth: Arc<MemoryAuth>) -> ChatClient {
        ChatClient::new(self.ctx.clone(), auth)
    }

    /// Move the wall clock and the tokio clock together. Needs a paused
    /// runtime for the tokio side to be instant.
    pub async fn advance(&self, by: Duration) {
        self.clock.advance(by);
        tokio::time::sleep(by).await;
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `condition` until it holds or [`WAIT_TIMEOUT`] passes
pub async fn wait_until<F>(mut condition: F) -> Result<()>
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            bail!("condition not met within {WAIT_TIMEOUT:?}");
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    Ok(())
}

/// Wait until the watched value satisfies `predicate` and return it
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, mut predicate: F) -> Result<T>
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let value = with_timeout(rx.wait_for(|value| predicate(value))).await??;
    Ok(value.clone())
}

/// Run `future` under [`WAIT_TIMEOUT`]
pub async fn with_timeout<F: Future>(future: F) -> Result<F::Output> {
    Ok(tokio::time::timeout(WAIT_TIMEOUT, future).await?)
}

/// Let spawned tasks run for a few scheduler turns
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
