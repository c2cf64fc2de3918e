//! REST API gateway for the bookshelf backend.
//!
//! This module provides the `ApiClient` every component uses to reach the
//! backend, plus the `ApiRequest` builder and the `ApiError` taxonomy.
//!
//! The backend uses JWT bearer token authentication; tokens are obtained
//! through `/auth/login` and attached to every request while signed in.

pub mod client;
pub mod error;
pub mod request;

pub use client::ApiClient;
pub use error::ApiError;
pub use request::{ApiRequest, RequestBody};
