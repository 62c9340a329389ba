//! Test fixtures and data generators
//!
//! Provides reusable test data for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chat_core::{Message, MessageId, Session};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Fixed starting instant for the manual clock
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// Session with a fixed id and email
pub fn session(id: &str, email: &str) -> Session {
    Session::new(id, email)
}

/// Session with a fresh id and email
pub fn unique_session() -> Session {
    let suffix = unique_suffix();
    Session::new(format!("user-{suffix}"), format!("test{suffix}@example.com"))
}

/// Message `n` of a history, `n` seconds after `start_time() - 1h`. Ids sort
/// in creation order: `m001`, `m002`, ...
pub fn message(n: u32) -> Message {
    Message {
        id: MessageId::new(format!("m{n:03}")),
        text: format!("message {n}"),
        created_at: start_time() - Duration::hours(1) + Duration::seconds(i64::from(n)),
        email: "author@example.com".to_string(),
        avatar_url: None,
    }
}

/// Messages `1..=count`, oldest first
pub fn history(count: u32) -> Vec<Message> {
    (1..=count).map(message).collect()
}

/// Raw presence document as another client would have written it
pub fn presence_document(id: &str, email: &str, last_active_at: DateTime<Utc>) -> Value {
    json!({
        "id": id,
        "email": email,
        "avatarUrl": null,
        "lastActiveAt": last_active_at.to_rfc3339(),
        "status": "active",
    })
}
