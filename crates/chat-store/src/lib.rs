//! # chat-store
//!
//! In-memory stand-in for the hosted document backend.
//!
//! ## Features
//!
//! - **Presence**: JSON documents keyed by user id with merge-update semantics
//! - **Messages**: time-ordered collection with `start_after` pagination
//! - **Live queries**: every write publishes a change; subscribers receive a
//!   fresh snapshot of the query
//! - **Auth**: a sign-in provider that hands out a configured identity
//! - **Faults**: failure injection and write counters for tests
//!
//! ## Example
//!
//! ```ignore
//! use chat_store::{MemoryBackend, MemoryAuth};
//!
//! let backend = MemoryBackend::new();
//! let presence = backend.presence_store();   // Arc<dyn PresenceStore>
//! let messages = backend.message_store();    // Arc<dyn MessageStore>
//!
//! // Make every write fail until switched back
//! backend.faults().set_fail_writes(true);
//! ```

mod auth;
mod backend;
mod changes;
mod faults;
mod messages;
mod presence;

pub use auth::MemoryAuth;
pub use backend::MemoryBackend;
pub use faults::{FaultInjector, ReadHold};
pub use messages::MemoryMessageStore;
pub use presence::MemoryPresenceStore;
