//! Value objects - immutable domain primitives

mod cursor;
mod ids;
mod status;

pub use cursor::MessageCursor;
pub use ids::{MessageId, UserId};
pub use status::{classify, PresenceStatus};
