use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password: {0}")]
    InvalidCredentials(String),

    #[error("Invalid verification code: {0}")]
    InvalidCode(String),

    #[error("No login is waiting for a verification code")]
    NoPendingChallenge,

    #[error("Not signed in")]
    NotAuthenticated,

    /// The session was reset or replaced while the request was in flight;
    /// the response was discarded.
    #[error("Session changed before the response arrived")]
    Superseded,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials(_) => "Invalid email or password".to_string(),
            AuthError::InvalidCode(_) => "Invalid verification code".to_string(),
            AuthError::Api(ApiError::Rejected { message, .. }) => message.clone(),
            AuthError::Api(ApiError::NetworkError(e)) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            AuthError::Api(ApiError::NetworkError(_)) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}
