//! Domain entities - core business objects

mod message;
mod presence;
mod session;

pub use message::{display_order, Message, NewMessage};
pub use presence::{build_roster, sort_roster, PresencePatch, PresenceRecord, PresenceView};
pub use session::Session;
