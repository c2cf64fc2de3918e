//! Session and authentication core for the bookshelf catalog client.
//!
//! The pieces, leaf first:
//!
//! - [`auth::CredentialStore`]: persists the bearer token and cached profile
//! - [`api::ApiClient`]: single HTTP gateway; attaches the token and resets
//!   the session when the backend rejects it
//! - [`auth::SessionManager`]: login, two-factor step-up, logout, restore
//! - [`navigation::NavigationGuard`]: allows or redirects route changes
//!
//! ```no_run
//! use std::sync::Arc;
//! use bookshelf_core::auth::{MemoryCredentialStore, SessionManager};
//! use bookshelf_core::config::ApiSettings;
//! use bookshelf_core::navigation::{NavigationGuard, RouteTable};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = SessionManager::new(
//!     &ApiSettings::default(),
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(|location: &str| println!("redirect to {location}")),
//! )?;
//! manager.restore().await;
//!
//! let guard = NavigationGuard::new(RouteTable::default(), manager.session().clone());
//! println!("{:?}", guard.check("/my-library"));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;

pub use api::{ApiClient, ApiError, ApiRequest};
pub use auth::{AuthError, CredentialStore, Session, SessionHandle, SessionManager, SessionState};
pub use config::{ApiSettings, Config};
pub use navigation::{Navigation, NavigationGuard, Navigator, RouteAccess, RouteTable};
