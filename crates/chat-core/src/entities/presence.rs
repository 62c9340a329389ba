//! Presence records and the roster derived from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use super::Session;
use crate::value_objects::{classify, PresenceStatus, UserId};

/// Per-user presence document, keyed by the owner's user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub last_active_at: DateTime<Utc>,
    /// Stored status. Always written as `Active` and never trusted by readers.
    #[serde(default)]
    pub status: PresenceStatus,
}

impl PresenceRecord {
    /// Fresh record for a session that just signed in
    pub fn for_session(session: &Session, now: DateTime<Utc>) -> Self {
        Self {
            id: session.user_id.clone(),
            email: session.email.clone(),
            avatar_url: session.avatar_url.clone(),
            last_active_at: now,
            status: PresenceStatus::Active,
        }
    }

    /// Effective status as seen at `now`
    pub fn effective_status(&self, now: DateTime<Utc>, threshold: Duration) -> PresenceStatus {
        classify(self.last_active_at, now, threshold)
    }
}

/// Merge-update payload. Only the fields that are set get written; other
/// stored fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `Some(None)` writes `null`, clearing a stored avatar
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub avatar_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceStatus>,
}

impl PresencePatch {
    /// Heartbeat refresh: timestamp and status only
    pub fn heartbeat(now: DateTime<Utc>) -> Self {
        Self {
            last_active_at: Some(now),
            status: Some(PresenceStatus::Active),
            ..Self::default()
        }
    }

    /// Sign-in refresh of an existing record: timestamp, status and identity.
    /// The avatar is always written, as `null` when the session has none.
    pub fn sign_in(session: &Session, now: DateTime<Utc>) -> Self {
        Self {
            email: Some(session.email.clone()),
            avatar_url: Some(session.avatar_url.clone()),
            ..Self::heartbeat(now)
        }
    }
}

/// A field that is present, even as `null`, decodes to `Some`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Roster entry: a presence record with its locally derived status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView {
    pub id: UserId,
    pub email: String,
    pub avatar_url: Option<String>,
    pub last_active_at: DateTime<Utc>,
    pub status: PresenceStatus,
}

impl PresenceView {
    /// Classify a record as seen at `now`
    pub fn from_record(record: PresenceRecord, now: DateTime<Utc>, threshold: Duration) -> Self {
        let status = record.effective_status(now, threshold);
        Self {
            id: record.id,
            email: record.email,
            avatar_url: record.avatar_url,
            last_active_at: record.last_active_at,
            status,
        }
    }
}

/// Sort a roster: active before inactive, then case-insensitive email, then id.
pub fn sort_roster(roster: &mut [PresenceView]) {
    roster.sort_by_cached_key(|view| (view.status.rank(), view.email.to_lowercase(), view.id.clone()));
}

/// Classify every record at `now` and return the sorted roster
pub fn build_roster(
    records: Vec<PresenceRecord>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> Vec<PresenceView> {
    let mut roster: Vec<PresenceView> = records
        .into_iter()
        .map(|record| PresenceView::from_record(record, now, threshold))
        .collect();
    sort_roster(&mut roster);
    roster
}
