//! Service context - dependency container for services
//!
//! Holds the backend stores, the clock and the tuning every service reads.

use std::sync::Arc;
use std::time::Duration;

use chat_common::AppConfig;
use chat_core::{Clock, MessageStore, PresenceStore, SystemClock, MAX_PAGE_SIZE};

use super::error::{ServiceError, ServiceResult};
use super::retry::RetryPolicy;

/// Timings and sizes shared by the services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub heartbeat_interval: Duration,
    pub active_threshold: Duration,
    pub page_size: usize,
    pub retry: RetryPolicy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            heartbeat_interval: config.presence.heartbeat_interval(),
            active_threshold: config.presence.active_threshold(),
            page_size: config.feed.page_size.clamp(1, MAX_PAGE_SIZE),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }
}

/// Service context containing all dependencies
///
/// Cheap to clone; every clone shares the same stores and clock.
#[derive(Clone)]
pub struct ServiceContext {
    presence_store: Arc<dyn PresenceStore>,
    message_store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
}

impl ServiceContext {
    pub fn new(
        presence_store: Arc<dyn PresenceStore>,
        message_store: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            presence_store,
            message_store,
            clock,
            settings,
        }
    }

    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    /// Get the presence store
    pub fn presence_store(&self) -> Arc<dyn PresenceStore> {
        Arc::clone(&self.presence_store)
    }

    /// Get the message store
    pub fn message_store(&self) -> Arc<dyn MessageStore> {
        Arc::clone(&self.message_store)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("stores", &"...")
            .field("settings", &self.settings)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
pub struct ServiceContextBuilder {
    presence_store: Option<Arc<dyn PresenceStore>>,
    message_store: Option<Arc<dyn MessageStore>>,
    clock: Option<Arc<dyn Clock>>,
    settings: ServiceSettings,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            presence_store: None,
            message_store: None,
            clock: None,
            settings: ServiceSettings::default(),
        }
    }

    pub fn presence_store(mut self, store: Arc<dyn PresenceStore>) -> Self {
        self.presence_store = Some(store);
        self
    }

    pub fn message_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.message_store = Some(store);
        self
    }

    /// Defaults to the system clock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(self, config: &AppConfig) -> Self {
        self.settings(ServiceSettings::from_config(config))
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.settings.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.settings.retry = retry;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Internal` if a store is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.presence_store
                .ok_or_else(|| ServiceError::internal("presence_store is required"))?,
            self.message_store
                .ok_or_else(|| ServiceError::internal("message_store is required"))?,
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.settings,
        ))
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
