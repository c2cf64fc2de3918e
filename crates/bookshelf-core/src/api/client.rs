//! HTTP gateway for the bookshelf REST API.
//!
//! Every call to the backend goes through [`ApiClient::send`]. The client
//! attaches the session's bearer token on the way out and, when the backend
//! rejects that token with a 401, clears the stored credentials and the
//! session and asks the host to redirect to the login page. That happens
//! before the caller gets its error back.

use std::sync::Arc;

use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::request::{ApiRequest, RequestBody};
use super::ApiError;
use crate::auth::{CredentialStore, SessionHandle};
use crate::config::ApiSettings;
use crate::navigation::{Navigator, LOGIN_PATH};

/// Success body written by the backend: `{"data": ..., "message": "..."}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

/// API client for the bookshelf backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionHandle,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        settings: &ApiSettings,
        session: SessionHandle,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            session,
            store,
            navigator,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn auth_headers(token: &str) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidToken)?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
        Ok(headers)
    }

    /// Send a request and return the raw response if its status is a success.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let ApiRequest {
            method,
            path,
            query,
            body,
            bearer,
        } = request;

        let url = self.url(&path);
        let token = bearer.or_else(|| self.session.token());

        let mut builder = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(ref token) = token {
            builder = builder.headers(Self::auth_headers(token)?);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        debug!(%method, path = %path, authenticated = token.is_some(), "Sending request");
        let response = builder.send().await?;
        self.check_response(response, token.as_deref()).await
    }

    /// Check if response is successful, returning an error with body if not.
    /// A 401 for the session's current token de-authenticates first. A 401
    /// on a request sent without a bearer (wrong password, wrong 2FA code)
    /// or with a token the session no longer holds is passed through
    /// without touching the session.
    async fn check_response(
        &self,
        response: Response,
        sent_token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status, &body);

        if error.is_unauthorized() {
            if let Some(token) = sent_token {
                self.deauthenticate(token);
            }
        }
        Err(error)
    }

    /// Clear stored credentials and the session, then redirect to login.
    /// Only acts when `rejected_token` is still the session's token, so
    /// repeated or stale 401s are no-ops.
    fn deauthenticate(&self, rejected_token: &str) {
        {
            let mut session = self.session.write();
            if session.token() != Some(rejected_token) {
                debug!("401 for a token that is no longer current, ignoring");
                return;
            }
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear stored credentials");
            }
            session.reset();
        }

        info!("Credential rejected by the backend, session cleared");
        self.navigator.navigate(LOGIN_PATH);
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<Envelope<T>, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    /// Send a request and return the `data` field of the response.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        let envelope: Envelope<T> = Self::decode(response, &path).await?;
        envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse(format!("No data in response from {}", path)))
    }

    /// Send a request whose response carries only a `message`.
    pub async fn fetch_message(&self, request: ApiRequest) -> Result<Option<String>, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        let envelope: Envelope<serde_json::Value> = Self::decode(response, &path).await?;
        Ok(envelope.message)
    }

    // ===== Shorthands for data stores =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.fetch(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.fetch(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<Option<String>, ApiError> {
        self.fetch_message(ApiRequest::delete(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentialStore;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(
            &ApiSettings::new(base_url),
            SessionHandle::new(),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(|_: &str| {}),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joining() {
        let api = client("http://localhost:8080/api/");
        assert_eq!(api.base_url(), "http://localhost:8080/api");
        assert_eq!(api.url("/auth/me"), "http://localhost:8080/api/auth/me");
        assert_eq!(api.url("books"), "http://localhost:8080/api/books");
    }

    #[test]
    fn test_auth_headers() {
        let headers = ApiClient::auth_headers("abc").unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        assert!(headers[header::AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_auth_headers_rejects_control_characters() {
        assert!(matches!(
            ApiClient::auth_headers("bad\ntoken"),
            Err(ApiError::InvalidToken)
        ));
    }
}
