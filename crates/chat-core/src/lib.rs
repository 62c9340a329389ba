//! # chat-core
//!
//! Domain layer containing entities, value objects, store ports, and pure
//! presence/feed rules. This crate has no dependency on any concrete backend.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    build_roster, display_order, sort_roster, Message, NewMessage, PresencePatch, PresenceRecord,
    PresenceView, Session,
};
pub use error::DomainError;
pub use traits::{
    AuthProvider, Clock, ManualClock, MessageQuery, MessageStore, PresenceStore, RepoResult,
    SnapshotStream, SystemClock, MAX_PAGE_SIZE,
};
pub use value_objects::{classify, MessageCursor, MessageId, PresenceStatus, UserId};
