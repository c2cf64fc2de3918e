//! Session state machine: login, two-factor step-up, logout and restore.
//!
//! ```text
//! Anonymous ──login──▶ Authenticated
//!     │                      ▲
//!     └─login (2FA)─▶ AwaitingSecondFactor ──verify──┘
//! any ──logout / 401──▶ Anonymous
//! ```
//!
//! The manager is the only writer of the shared [`SessionHandle`] apart
//! from the gateway's 401 reset. Each commit writes the credential store
//! and the session under one write lock.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{AuthError, CredentialStore, Session, SessionHandle, SessionState};
use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::config::ApiSettings;
use crate::models::{
    CodeRequest, LoginOutcome, LoginRequest, LoginResponse, Profile, RegisterRequest,
    RegisteredAccount, TwoFactorSetup, VerifyLoginRequest, VerifyLoginResponse,
};
use crate::navigation::Navigator;

// ============================================================================
// Endpoints
// ============================================================================

const REGISTER_PATH: &str = "/auth/register";
const LOGIN_PATH: &str = "/auth/login";
const VERIFY_LOGIN_PATH: &str = "/auth/2fa/verify-login";
const ME_PATH: &str = "/auth/me";
const TWO_FACTOR_SETUP_PATH: &str = "/auth/2fa/setup";
const TWO_FACTOR_VERIFY_PATH: &str = "/auth/2fa/verify";
const TWO_FACTOR_DISABLE_PATH: &str = "/auth/2fa/disable";

fn make_admin_path(user_id: i64) -> String {
    format!("/auth/users/{}/make-admin", user_id)
}

/// Backend rejections of a 2FA code come back as 400 or 401.
fn code_error(error: ApiError) -> AuthError {
    match error {
        ApiError::Unauthorized(message) | ApiError::Rejected { message, .. } => {
            AuthError::InvalidCode(message)
        }
        other => other.into(),
    }
}

/// Clone is cheap; clones share the session, store and connection pool.
#[derive(Clone)]
pub struct SessionManager {
    api: ApiClient,
    session: SessionHandle,
    store: Arc<dyn CredentialStore>,
}

impl SessionManager {
    /// Build a manager with an empty session. Call [`SessionManager::restore`]
    /// at startup to pick up persisted credentials.
    pub fn new(
        settings: &ApiSettings,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let session = SessionHandle::new();
        let api = ApiClient::new(settings, session.clone(), store.clone(), navigator)?;
        Ok(Self { api, session, store })
    }

    /// Gateway for other components (catalog stores etc.).
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    // ===== Read accessors =====

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn snapshot(&self) -> Session {
        self.session.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.session.read().is_admin()
    }

    pub fn current_user(&self) -> Option<Profile> {
        self.session.read().user().cloned()
    }

    // ===== Commits =====

    /// Persist and install token + profile, unless the session moved on
    /// since `epoch` was read.
    fn commit_authenticated(&self, epoch: u64, token: String, user: Profile) -> Result<(), AuthError> {
        let mut session = self.session.write();
        if session.epoch() != epoch {
            debug!(expected = epoch, current = session.epoch(), "Discarding stale sign-in");
            return Err(AuthError::Superseded);
        }
        if let Err(e) = self.store.save(&token, &user) {
            warn!(error = %e, "Failed to save credentials");
        }
        info!(user_id = user.id, "Signed in");
        session.authenticate(token, user);
        Ok(())
    }

    /// Re-persist the current token and profile after a profile change.
    fn persist_current(&self, session: &Session) {
        if let (Some(token), Some(user)) = (session.token(), session.user()) {
            if let Err(e) = self.store.save(token, user) {
                warn!(error = %e, "Failed to save credentials");
            }
        }
    }

    fn require_authenticated(&self) -> Result<u64, AuthError> {
        let session = self.session.read();
        if session.is_authenticated() {
            Ok(session.epoch())
        } else {
            Err(AuthError::NotAuthenticated)
        }
    }

    // ===== Operations =====

    /// Create an account. Does not sign in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisteredAccount, AuthError> {
        let account: RegisteredAccount = self
            .api
            .fetch(ApiRequest::post(REGISTER_PATH).json(request)?)
            .await?;
        info!(user_id = account.user.id, "Account registered");
        Ok(account)
    }

    /// Password login. Either signs in or leaves the session waiting for a
    /// second factor.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginOutcome, AuthError> {
        let epoch = self.session.epoch();

        let response: LoginResponse = self
            .api
            .fetch(ApiRequest::post(LOGIN_PATH).json(request)?)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(message) => AuthError::InvalidCredentials(message),
                other => other.into(),
            })?;

        match response {
            LoginResponse::Authenticated { tokens, user } => {
                self.commit_authenticated(epoch, tokens.access_token, user)?;
                Ok(LoginOutcome::Authenticated)
            }
            LoginResponse::Challenge {
                requires_2fa: true,
                user_id,
            } => {
                let mut session = self.session.write();
                if session.epoch() != epoch {
                    return Err(AuthError::Superseded);
                }
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear stored credentials");
                }
                session.await_second_factor(user_id);
                info!(user_id, "Second factor required");
                Ok(LoginOutcome::SecondFactorRequired { user_id })
            }
            LoginResponse::Challenge {
                requires_2fa: false,
                ..
            } => Err(ApiError::InvalidResponse(
                "Login response carried neither tokens nor a 2FA challenge".to_string(),
            )
            .into()),
        }
    }

    /// Complete a pending login with a 2FA code. A rejected code leaves the
    /// challenge in place so the user can try again.
    ///
    /// The profile is fetched with the new token before anything is
    /// committed, so the session never holds a token without a profile.
    pub async fn verify_second_factor(&self, code: &str) -> Result<(), AuthError> {
        let (epoch, user_id) = {
            let session = self.session.read();
            let challenge = session
                .pending_challenge()
                .ok_or(AuthError::NoPendingChallenge)?;
            (session.epoch(), challenge.user_id)
        };

        let response: VerifyLoginResponse = self
            .api
            .fetch(ApiRequest::post(VERIFY_LOGIN_PATH).json(&VerifyLoginRequest { user_id, code })?)
            .await
            .map_err(code_error)?;
        let token = response.tokens.access_token;

        let mut user: Profile = self
            .api
            .fetch(ApiRequest::get(ME_PATH).bearer(token.clone()))
            .await?;
        // `/auth/me` omits the flag; passing the challenge proves it is on
        user.two_factor_enabled = true;

        self.commit_authenticated(epoch, token, user)
    }

    /// Give up on a login waiting for its second factor.
    pub fn abandon_login(&self) {
        let mut session = self.session.write();
        if session.pending_challenge().is_some() {
            session.abandon_challenge();
            debug!("Pending login abandoned");
        }
    }

    /// Sign out locally. Always ends anonymous with no stored credentials.
    pub fn logout(&self) {
        let mut session = self.session.write();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        session.reset();
        info!("Signed out");
    }

    /// Refresh the cached profile from `/auth/me`, keeping the login-only
    /// fields it does not report. Any failure signs out instead of
    /// returning an error: a session whose profile cannot be read is not
    /// usable.
    pub async fn fetch_profile(&self) -> Option<Profile> {
        let epoch = self.require_authenticated().ok()?;

        match self.api.fetch::<Profile>(ApiRequest::get(ME_PATH)).await {
            Ok(user) => {
                let mut session = self.session.write();
                if session.epoch() != epoch {
                    debug!("Session changed while fetching profile, discarding");
                    return None;
                }
                let merged = session.refresh_user(user);
                self.persist_current(&session);
                merged
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch profile, signing out");
                if self.session.epoch() == epoch {
                    self.logout();
                }
                None
            }
        }
    }

    /// Rebuild the session from the credential store at startup.
    ///
    /// A stored profile is trusted without a network call. A bare token is
    /// checked by fetching the profile with it; if that fails the stored
    /// credentials are dropped.
    pub async fn restore(&self) -> SessionState {
        let Some(record) = self.store.load() else {
            debug!("No stored credentials");
            return self.state();
        };

        match record.user {
            Some(user) => {
                let mut session = self.session.write();
                info!(user_id = user.id, "Session restored from storage");
                session.authenticate(record.access_token, user);
            }
            None => {
                let epoch = self.session.epoch();
                let fetched = self
                    .api
                    .fetch::<Profile>(ApiRequest::get(ME_PATH).bearer(record.access_token.clone()))
                    .await;
                match fetched {
                    Ok(user) => {
                        if let Err(e) = self.commit_authenticated(epoch, record.access_token, user) {
                            debug!(error = %e, "Restored profile discarded");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Stored token has no usable profile, signing out");
                        if self.session.epoch() == epoch {
                            self.logout();
                        }
                    }
                }
            }
        }
        self.state()
    }

    // ===== Two-factor management (signed in) =====

    /// Start enabling 2FA: returns the shared secret and QR payload.
    pub async fn setup_second_factor(&self) -> Result<TwoFactorSetup, AuthError> {
        self.require_authenticated()?;
        let setup = self
            .api
            .fetch(ApiRequest::post(TWO_FACTOR_SETUP_PATH))
            .await?;
        Ok(setup)
    }

    /// Confirm 2FA setup with a code from the authenticator app.
    pub async fn confirm_second_factor_setup(&self, code: &str) -> Result<(), AuthError> {
        let epoch = self.require_authenticated()?;
        self.api
            .fetch_message(ApiRequest::post(TWO_FACTOR_VERIFY_PATH).json(&CodeRequest { code })?)
            .await
            .map_err(code_error)?;
        self.set_two_factor_enabled(epoch, true);
        Ok(())
    }

    pub async fn disable_second_factor(&self, code: &str) -> Result<(), AuthError> {
        let epoch = self.require_authenticated()?;
        self.api
            .fetch_message(ApiRequest::post(TWO_FACTOR_DISABLE_PATH).json(&CodeRequest { code })?)
            .await
            .map_err(code_error)?;
        self.set_two_factor_enabled(epoch, false);
        Ok(())
    }

    fn set_two_factor_enabled(&self, epoch: u64, enabled: bool) {
        let mut session = self.session.write();
        if session.epoch() != epoch {
            return;
        }
        if let Some(user) = session.user_mut() {
            user.two_factor_enabled = enabled;
        }
        self.persist_current(&session);
        info!(enabled, "Two-factor setting changed");
    }

    // ===== Administration =====

    /// Grant admin rights to another account. Server-side only; the local
    /// session is unchanged.
    pub async fn grant_admin(&self, user_id: i64) -> Result<(), AuthError> {
        self.require_authenticated()?;
        self.api
            .fetch_message(ApiRequest::post(make_admin_path(user_id)))
            .await?;
        info!(user_id, "Admin rights granted");
        Ok(())
    }
}
