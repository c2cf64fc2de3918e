use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::Profile;

/// Observable authentication state, derived from a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// Password accepted, waiting for a 2FA code for this user id.
    AwaitingSecondFactor { user_id: i64 },
    Authenticated,
}

/// Login that passed password verification but still needs a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingChallenge {
    pub user_id: i64,
}

#[derive(Debug, Clone)]
struct Credentials {
    token: String,
    user: Profile,
}

/// Client-side view of the authentication state.
///
/// Token and profile live together in one field, and a pending challenge
/// can only exist without them, so the half-authenticated shapes cannot be
/// constructed. `epoch` increases whenever the identity changes (sign-in,
/// challenge, reset); operations that await the network compare it before
/// committing so a late response cannot bring a cleared session back.
#[derive(Debug, Clone, Default)]
pub struct Session {
    credentials: Option<Credentials>,
    pending: Option<PendingChallenge>,
    epoch: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match (&self.credentials, self.pending) {
            (Some(_), _) => SessionState::Authenticated,
            (None, Some(challenge)) => SessionState::AwaitingSecondFactor {
                user_id: challenge.user_id,
            },
            (None, None) => SessionState::Anonymous,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn user(&self) -> Option<&Profile> {
        self.credentials.as_ref().map(|c| &c.user)
    }

    pub fn pending_challenge(&self) -> Option<PendingChallenge> {
        self.pending
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user().map(|u| u.is_admin).unwrap_or(false)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // ===== Transitions (crate-private: the session manager is the writer) =====

    pub(crate) fn authenticate(&mut self, token: String, user: Profile) {
        self.credentials = Some(Credentials { token, user });
        self.pending = None;
        self.epoch += 1;
    }

    pub(crate) fn await_second_factor(&mut self, user_id: i64) {
        self.credentials = None;
        self.pending = Some(PendingChallenge { user_id });
        self.epoch += 1;
    }

    /// Drop a pending challenge; no effect on an authenticated session.
    pub(crate) fn abandon_challenge(&mut self) {
        if self.pending.take().is_some() {
            self.epoch += 1;
        }
    }

    /// Forget everything and start a new epoch.
    pub(crate) fn reset(&mut self) {
        self.credentials = None;
        self.pending = None;
        self.epoch += 1;
    }

    /// Merge a freshly reported profile into the cached one and return the
    /// result. `None` when not authenticated.
    pub(crate) fn refresh_user(&mut self, reported: Profile) -> Option<Profile> {
        let credentials = self.credentials.as_mut()?;
        credentials.user.merge_reported(reported);
        Some(credentials.user.clone())
    }

    pub(crate) fn user_mut(&mut self) -> Option<&mut Profile> {
        self.credentials.as_mut().map(|c| &mut c.user)
    }
}

/// Shared handle to the session.
///
/// Collaborators get owned values ([`SessionHandle::snapshot`],
/// [`SessionHandle::state`], [`SessionHandle::token`]). Lock guards stay
/// inside the crate and are never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Owned copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn state(&self) -> SessionState {
        self.read().state()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token().map(str::to_string)
    }

    pub fn epoch(&self) -> u64 {
        self.read().epoch()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(is_admin: bool) -> Profile {
        Profile {
            id: 1,
            email: "a@example.com".to_string(),
            username: "a".to_string(),
            is_admin,
            two_factor_enabled: false,
            email_verified: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_new_session_is_anonymous() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.token().is_none());
        assert!(session.user().is_none());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_authenticate_sets_token_and_user_together() {
        let mut session = Session::new();
        session.authenticate("T".to_string(), profile(true));
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.token(), Some("T"));
        assert!(session.is_admin());
    }

    #[test]
    fn test_challenge_excludes_token() {
        let mut session = Session::new();
        session.authenticate("T".to_string(), profile(false));
        session.await_second_factor(42);
        assert_eq!(session.state(), SessionState::AwaitingSecondFactor { user_id: 42 });
        assert!(session.token().is_none());
        assert!(session.user().is_none());

        session.authenticate("T2".to_string(), profile(false));
        assert!(session.pending_challenge().is_none());
    }

    #[test]
    fn test_reset_bumps_epoch() {
        let mut session = Session::new();
        session.authenticate("T".to_string(), profile(false));
        let before = session.epoch();
        session.reset();
        assert_eq!(session.epoch(), before + 1);
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_identity_changes_bump_epoch() {
        let mut session = Session::new();
        session.await_second_factor(1);
        let after_challenge = session.epoch();
        session.authenticate("T".to_string(), profile(false));
        assert!(session.epoch() > after_challenge);

        // Profile refresh keeps the epoch
        let signed_in = session.epoch();
        session.refresh_user(profile(true));
        assert_eq!(session.epoch(), signed_in);
    }

    #[test]
    fn test_refresh_user_requires_credentials() {
        let mut session = Session::new();
        assert!(session.refresh_user(profile(true)).is_none());
        assert!(session.user().is_none());

        session.authenticate("T".to_string(), profile(false));
        let merged = session.refresh_user(profile(true)).unwrap();
        assert!(merged.is_admin);
        assert!(session.is_admin());
    }

    #[test]
    fn test_abandon_challenge_keeps_credentials() {
        let mut session = Session::new();
        session.await_second_factor(9);
        session.abandon_challenge();
        assert_eq!(session.state(), SessionState::Anonymous);

        session.authenticate("T".to_string(), profile(false));
        session.abandon_challenge();
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_handle_shares_state() {
        let handle = SessionHandle::new();
        let other = handle.clone();
        handle.write().authenticate("T".to_string(), profile(false));
        assert_eq!(other.token().as_deref(), Some("T"));
        assert_eq!(other.state(), SessionState::Authenticated);
    }
}
