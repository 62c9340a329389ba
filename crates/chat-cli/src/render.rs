//! Plain-text rendering of messages and the roster

use chat_core::{Message, MessageId, PresenceStatus, PresenceView};
use chrono::{DateTime, Utc};

/// "Jan 5, 2024, 3:04:05 PM"
const TIMESTAMP_FORMAT: &str = "%b %-d, %Y, %-I:%M:%S %p";

/// Single uppercase letter standing in for a missing avatar
pub fn initial(email: &str) -> char {
    email
        .chars()
        .next()
        .map_or('?', |c| c.to_uppercase().next().unwrap_or(c))
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn message_line(message: &Message) -> String {
    format!(
        "[{}] ({}) {}: {}",
        timestamp(message.created_at),
        initial(&message.email),
        message.email,
        message.text
    )
}

pub fn roster_line(view: &PresenceView) -> String {
    let marker = match view.status {
        PresenceStatus::Active => '*',
        PresenceStatus::Inactive => '-',
    };
    format!(
        "{marker} ({}) {} [{}]",
        initial(&view.email),
        view.email,
        view.status
    )
}

pub fn roster_block(roster: &[PresenceView]) -> String {
    if roster.is_empty() {
        return "(nobody here)".to_string();
    }
    roster.iter().map(roster_line).collect::<Vec<_>>().join("\n")
}

/// Emails of active users, in roster order
pub fn active_emails(roster: &[PresenceView]) -> Vec<String> {
    roster
        .iter()
        .filter(|view| view.status.is_active())
        .map(|view| view.email.clone())
        .collect()
}

/// Messages of a display-ordered snapshot that come after `mark`, advancing
/// `mark` to the newest one
pub fn newer_than<'a>(
    snapshot: &'a [Message],
    mark: &mut Option<(DateTime<Utc>, MessageId)>,
) -> Vec<&'a Message> {
    let fresh: Vec<&Message> = snapshot
        .iter()
        .filter(|m| {
            mark.as_ref()
                .is_none_or(|(at, id)| (m.created_at, &m.id) > (*at, id))
        })
        .collect();

    if let Some(last) = fresh.last() {
        *mark = Some((last.created_at, last.id.clone()));
    }
    fresh
}
