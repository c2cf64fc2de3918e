//! Mock backend and session fixtures for integration tests.
//!
//! The mock server speaks the backend's envelope format:
//! `{"data": ...}` on success and `{"error", "message"}` on failure.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bookshelf_core::auth::{CredentialRecord, CredentialStore, MemoryCredentialStore, SessionManager};
use bookshelf_core::config::ApiSettings;
use bookshelf_core::models::{LoginRequest, Profile};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "access-token-1";

pub struct TestBackend {
    pub server: MockServer,
    pub manager: SessionManager,
    pub store: Arc<MemoryCredentialStore>,
    redirects: Arc<Mutex<Vec<String>>>,
}

impl TestBackend {
    pub async fn start() -> Self {
        Self::with_store(MemoryCredentialStore::new()).await
    }

    pub async fn with_record(record: CredentialRecord) -> Self {
        Self::with_store(MemoryCredentialStore::with_record(record)).await
    }

    async fn with_store(store: MemoryCredentialStore) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(store);
        let redirects = Arc::new(Mutex::new(Vec::new()));

        let recorded = redirects.clone();
        let manager = SessionManager::new(
            &ApiSettings::new(format!("{}/api", server.uri())),
            store.clone() as Arc<dyn CredentialStore>,
            Arc::new(move |location: &str| recorded.lock().unwrap().push(location.to_string())),
        )
        .expect("client builds");

        Self {
            server,
            manager,
            store,
            redirects,
        }
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }

    /// Sign in through a mocked `/auth/login` without 2FA.
    pub async fn sign_in(&self, user: Value) {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(data(json!({
                "tokens": {"access_token": TOKEN, "refresh_token": "refresh"},
                "user": user,
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;

        self.manager
            .login(&credentials())
            .await
            .expect("login succeeds");
    }

    /// Assert the token/profile invariant on both the session and the store.
    pub fn assert_consistent(&self) {
        let session = self.manager.snapshot();
        assert_eq!(session.token().is_some(), session.user().is_some());
        if session.pending_challenge().is_some() {
            assert!(session.token().is_none());
        }
        match self.store.load() {
            Some(record) => {
                assert_eq!(Some(record.access_token.as_str()), session.token());
                assert!(record.user.is_some());
            }
            None => assert!(session.token().is_none()),
        }
    }
}

pub fn credentials() -> LoginRequest {
    LoginRequest {
        email: "a@example.com".to_string(),
        password: "p".to_string(),
    }
}

pub fn user_json(id: i64, is_admin: bool, two_factor_enabled: bool) -> Value {
    json!({
        "id": id,
        "email": "a@example.com",
        "username": "a",
        "is_admin": is_admin,
        "two_factor_enabled": two_factor_enabled,
        "email_verified": true,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

pub fn profile(id: i64, is_admin: bool) -> Profile {
    serde_json::from_value(user_json(id, is_admin, false)).unwrap()
}

/// Success envelope carrying `data`.
pub fn data(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": value }))
}

/// Success envelope carrying only a message.
pub fn message(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "message": text }))
}

/// Error envelope as written by the backend.
pub fn error(status: u16, text: &str) -> ResponseTemplate {
    let reason = match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    ResponseTemplate::new(status).set_body_json(json!({ "error": reason, "message": text }))
}
