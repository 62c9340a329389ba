//! Presence status and the staleness rule that derives it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Presence status of a user
///
/// The stored value is always written as `Active`; what other clients show is
/// recomputed from `last_active_at` with [`classify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Seen within the staleness threshold
    Active,
    /// Not seen for at least the staleness threshold
    #[default]
    Inactive,
}

impl PresenceStatus {
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Sort rank: active users are listed first
    #[inline]
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Inactive => 1,
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("Invalid presence status: {s}")),
        }
    }
}

/// Derive the effective status of a presence record.
///
/// `Active` iff `now - last_active_at < threshold`. A timestamp in the future
/// (clock skew between clients) counts as active.
pub fn classify(
    last_active_at: DateTime<Utc>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> PresenceStatus {
    let Ok(threshold) = chrono::Duration::from_std(threshold) else {
        // Larger than chrono can represent: nothing is ever stale
        return PresenceStatus::Active;
    };

    if now.signed_duration_since(last_active_at) < threshold {
        PresenceStatus::Active
    } else {
        PresenceStatus::Inactive
    }
}
