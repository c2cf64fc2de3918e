//! Authentication module for managing the client session and credentials.
//!
//! This module provides:
//! - `Session` / `SessionHandle`: the in-memory authentication state
//! - `SessionManager`: login, two-factor, logout and restore operations
//! - `CredentialStore`: durable mirror of the token and cached profile
//!   (file, OS keychain or in-memory)

pub mod credentials;
pub mod error;
pub mod manager;
pub mod session;

pub use credentials::{
    CredentialRecord, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore,
};
pub use error::AuthError;
pub use manager::SessionManager;
pub use session::{PendingChallenge, Session, SessionHandle, SessionState};
