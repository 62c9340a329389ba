//! Client services
//!
//! Everything a signed-in session runs: the presence tracker with its
//! heartbeat, the live message feed with backward pagination, and the scope
//! that owns both for the lifetime of the session.

pub mod client;
pub mod context;
pub mod error;
pub mod feed;
pub mod presence;
pub mod retry;
pub mod session;
pub mod subscription;

pub use client::ChatClient;
pub use context::{ServiceContext, ServiceContextBuilder, ServiceSettings};
pub use error::{ServiceError, ServiceResult};
pub use feed::{FeedPhase, MessageFeed, OlderPage};
pub use presence::PresenceTracker;
pub use retry::RetryPolicy;
pub use session::SessionScope;
pub use subscription::LiveSubscription;
