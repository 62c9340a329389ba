//! Session entity - the authenticated identity

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Authenticated identity, owned for the duration of a sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl Session {
    /// Create a new Session
    pub fn new(user_id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            avatar_url: None,
        }
    }

    /// Attach an avatar URL
    #[must_use]
    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}
