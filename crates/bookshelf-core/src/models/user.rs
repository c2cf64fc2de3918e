use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached profile of the signed-in account.
///
/// `GET /auth/me` only returns `id`, `email` and `is_admin`, while the login
/// response carries the full record, so everything past `id` is defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Profile {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub two_factor_enabled: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Name to show for the account: username when known, email otherwise.
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            &self.email
        } else {
            &self.username
        }
    }

    /// Fold a `/auth/me` record into this profile. Only the fields that
    /// endpoint reports are taken when it describes the same account; a
    /// different account replaces the profile outright.
    pub fn merge_reported(&mut self, reported: Profile) {
        if reported.id != self.id {
            *self = reported;
            return;
        }
        if !reported.email.is_empty() {
            self.email = reported.email;
        }
        self.is_admin = reported.is_admin;
    }
}

// ============================================================================
// Tests
// ============================================================================
