//! Ports - the interfaces the client needs from the hosted backend

mod auth;
mod clock;
mod stores;

pub use auth::AuthProvider;
pub use clock::{Clock, ManualClock, SystemClock};
pub use stores::{MessageQuery, MessageStore, PresenceStore, RepoResult, SnapshotStream, MAX_PAGE_SIZE};
