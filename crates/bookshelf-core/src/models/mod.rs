//! Data models shared by the gateway and session manager.
//!
//! - `Profile`: the cached account record
//! - Auth payloads: login, registration and two-factor requests/responses

pub mod auth;
pub mod user;

pub use auth::{
    LoginOutcome, LoginRequest, RegisterRequest, RegisteredAccount, TokenPair, TwoFactorSetup,
};
pub(crate) use auth::{CodeRequest, LoginResponse, VerifyLoginRequest, VerifyLoginResponse};
pub use user::Profile;
