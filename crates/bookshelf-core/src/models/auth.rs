//! Request and response payloads for the `/auth` endpoints.

use serde::{Deserialize, Serialize};

use super::Profile;

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/2fa/verify-login`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct VerifyLoginRequest<'a> {
    pub user_id: i64,
    pub code: &'a str,
}

/// Body of `POST /auth/2fa/verify` and `POST /auth/2fa/disable`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CodeRequest<'a> {
    pub code: &'a str,
}

/// Token pair issued by the backend. Only the access token is used;
/// the client never refreshes.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
}

/// `data` of a successful `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum LoginResponse {
    Challenge {
        requires_2fa: bool,
        user_id: i64,
    },
    Authenticated {
        tokens: TokenPair,
        user: Profile,
    },
}

/// `data` of a successful `POST /auth/2fa/verify-login`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VerifyLoginResponse {
    pub tokens: TokenPair,
}

/// `data` of a successful `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredAccount {
    pub user: Profile,
    #[serde(default)]
    pub message: Option<String>,
}

/// Shared secret and provisioning QR code returned by `POST /auth/2fa/setup`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct TwoFactorSetup {
    pub secret: String,
    pub qr_code: String,
}

/// Result of a password login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The session is now authenticated.
    Authenticated,
    /// The account has 2FA enabled; a code must be verified next.
    SecondFactorRequired { user_id: i64 },
}

impl LoginOutcome {
    pub fn requires_second_factor(&self) -> bool {
        matches!(self, LoginOutcome::SecondFactorRequired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_challenge() {
        let json = r#"{"requires_2fa": true, "user_id": 42, "message": "Please provide 2FA code"}"#;
        match serde_json::from_str::<LoginResponse>(json).unwrap() {
            LoginResponse::Challenge { requires_2fa, user_id } => {
                assert!(requires_2fa);
                assert_eq!(user_id, 42);
            }
            other => panic!("expected challenge, got {:?}", other),
        }
    }

    #[test]
    fn test_login_response_authenticated() {
        let json = r#"{
            "tokens": {"access_token": "T", "refresh_token": "R"},
            "user": {"id": 1, "email": "a@example.com", "username": "a"}
        }"#;
        match serde_json::from_str::<LoginResponse>(json).unwrap() {
            LoginResponse::Authenticated { tokens, user } => {
                assert_eq!(tokens.access_token, "T");
                assert_eq!(user.username, "a");
            }
            other => panic!("expected tokens, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_login_request_shape() {
        let body = serde_json::to_value(VerifyLoginRequest { user_id: 42, code: "000000" }).unwrap();
        assert_eq!(body, serde_json::json!({"user_id": 42, "code": "000000"}));
    }
}
