//! # chat-service
//!
//! Application layer: presence tracking, the paginated message feed, and the
//! session lifecycle that ties them to the authentication state.

pub mod services;

pub use services::{
    ChatClient, FeedPhase, LiveSubscription, MessageFeed, OlderPage, PresenceTracker, RetryPolicy,
    ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult, ServiceSettings,
    SessionScope,
};
